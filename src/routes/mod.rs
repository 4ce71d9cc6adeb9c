/// Router Module Index
///
/// Splits the API into three routers by who may call them. The split is about the
/// authentication layer only: role and ownership checks run inside the workflows.

/// Routes open to anonymous callers: health, registration, login and course reads.
pub mod public;

/// Routes behind the `AuthUser` middleware that any role may reach (subject to
/// per-operation checks such as Admin-or-self).
pub mod authenticated;

/// Routes behind the `AuthUser` middleware whose every operation is Admin only.
pub mod admin;

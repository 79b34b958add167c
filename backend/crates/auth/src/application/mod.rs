//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod deactivate;
pub mod login;
pub mod logout;
pub mod oauth;
pub mod password_reset;
pub mod refresh;
pub mod signup;
pub mod verification;

#[cfg(test)]
pub(crate) mod memory;

// Re-exports
pub use config::AuthConfig;
pub use deactivate::DeactivateUseCase;
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use oauth::{
    AvatarImporter, OAuthClient, OAuthLoginOutput, OAuthLoginUseCase, PassThroughAvatars,
    ProviderProfile,
};
pub use password_reset::{ForgotPasswordUseCase, ResetPasswordInput, ResetPasswordUseCase};
pub use refresh::{RefreshLedger, RefreshUseCase};
pub use signup::{SignUpInput, SignUpOutput, SignUpUseCase};
pub use verification::{CodeSource, EmailVerificationService, Mailer, OsRngCodes};

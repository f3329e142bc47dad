//! Presentation layer for Late: the shared runtime, services that run remote
//! calls off the caller's thread, and the models behind each surface.

pub mod bridge;
mod error_mapping;
pub mod models;
pub mod services;

pub use models::google_auth_model::GoogleAuthModel;
pub use models::screen_model::ScreenModel;
pub use models::widget_model::{Urgency, WidgetModel};

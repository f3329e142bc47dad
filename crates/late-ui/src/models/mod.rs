pub mod google_auth_model;
pub mod screen_model;
pub mod widget_model;

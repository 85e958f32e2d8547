// Bookmark services
// Services provide the supporting functionality: favicon discovery, staging and resizing, settings.

pub mod favicon_cache;
pub mod favicon_resolver;
pub mod favicon_service;
pub mod favicon_tasks;
pub mod image_resizer;
pub mod settings_engine;

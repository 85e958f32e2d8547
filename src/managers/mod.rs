// Bookmark managers
// Managers own the stateful operations over the bookmark tree.

pub mod bookmark_manager;

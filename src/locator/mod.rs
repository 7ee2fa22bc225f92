pub mod search_surface;

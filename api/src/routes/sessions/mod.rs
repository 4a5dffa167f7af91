pub mod session_routes;

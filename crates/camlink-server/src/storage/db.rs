//! SQLite database for the camlink server.

camlink_core::define_database!(CamDatabase, "Camlink database migrations complete");

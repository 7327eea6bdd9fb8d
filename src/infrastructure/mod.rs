pub mod csv_loader;

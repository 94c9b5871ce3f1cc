pub mod argparse;
pub mod commands;
pub mod connect;

pub mod dock_ops;
pub mod locate;
pub mod position;

pub mod args;
pub mod op;
pub mod ops;

pub use ops::{
    Alias, Build, Daemon, Health, Image, Init, Log, Mount, Pipe, Policy, Pull, Push, Rmi, Run,
    Stop, Version,
};

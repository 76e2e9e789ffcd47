pub mod alias;
pub mod daemon;
pub mod health;
pub mod init;
pub mod mount;
pub mod pipe;
pub mod policy;
pub mod tool;
pub mod version;

pub use alias::Alias;
pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use mount::Mount;
pub use pipe::Pipe;
pub use policy::Policy;
pub use tool::{Build, Image, Log, Pull, Push, Rmi, Run, Stop};
pub use version::Version;

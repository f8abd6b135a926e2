pub mod processor_factory;
pub mod subscription_commands;
pub mod subscription_sync;

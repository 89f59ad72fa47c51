mod dub_video;
mod error;

use async_trait::async_trait;
use uuid::Uuid;

pub use dub_video::{DubVideoCommand, DubVideoCommandHandler};
pub use error::CommandError;

pub trait Command: Send + Sync {
    type Result: Send;

    fn command_type(&self) -> &'static str;

    fn command_id(&self) -> Uuid;

    fn validate(&self) -> Result<(), CommandError>;
}

#[async_trait]
pub trait CommandHandler<C: Command + 'static>: Send + Sync {
    async fn handle(&self, command: C) -> Result<C::Result, CommandError>;
}

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use validator::Validate;

use super::{Command, CommandError, CommandHandler};
use crate::{DubVideoRequest, DubVideoResponse, DubVideoUseCase};

#[derive(Debug, Clone)]
pub struct DubVideoCommand {
    id: Uuid,
    pub request: DubVideoRequest,
}

impl DubVideoCommand {
    pub fn new(request: DubVideoRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
        }
    }
}

impl Command for DubVideoCommand {
    type Result = DubVideoResponse;

    fn command_type(&self) -> &'static str {
        "dub_video"
    }

    fn command_id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), CommandError> {
        self.request
            .validate()
            .map_err(|err| CommandError::validation("invalid_request", err.to_string()))
    }
}

pub struct DubVideoCommandHandler {
    usecase: Arc<dyn DubVideoUseCase>,
}

impl DubVideoCommandHandler {
    pub fn new(usecase: Arc<dyn DubVideoUseCase>) -> Self {
        Self { usecase }
    }
}

#[async_trait]
impl CommandHandler<DubVideoCommand> for DubVideoCommandHandler {
    async fn handle(&self, command: DubVideoCommand) -> Result<DubVideoResponse, CommandError> {
        command.validate()?;
        tracing::debug!(
            command_id = %command.command_id(),
            command_type = command.command_type(),
            job_id = %command.request.job_id,
            "handling command"
        );
        self.usecase.dub(command.request).await.map_err(|err| {
            if err.is_validation() {
                tracing::info!(reason = err.reason(), error = %err, "dubbing request rejected");
            } else {
                tracing::error!(reason = err.reason(), error = %err, "dubbing job failed");
            }
            CommandError::from(err)
        })
    }
}

//! Recording backend used by the unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::backend::{Backend, FinalizeRequest, GenerationRequest, GenerationResponse, ResponseKind};

pub enum Scripted {
    Reply(GenerationResponse),
    Delayed(Duration, GenerationResponse),
    Fail(&'static str),
    Hang,
}

#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Scripted>>,
    generated: Mutex<Vec<GenerationRequest>>,
    finalized: Mutex<Vec<FinalizeRequest>>,
    fail_finalize: AtomicBool,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn failing_finalize(self) -> Self {
        self.fail_finalize.store(true, Ordering::SeqCst);
        self
    }

    pub fn generated(&self) -> Vec<GenerationRequest> {
        self.generated.lock().unwrap().clone()
    }

    pub fn finalized(&self) -> Vec<FinalizeRequest> {
        self.finalized.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        self.generated.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Scripted::Fail(reason)) => Err(anyhow!(reason)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(anyhow!("script exhausted")),
        }
    }

    async fn finalize(&self, request: &FinalizeRequest) -> Result<()> {
        self.finalized.lock().unwrap().push(request.clone());
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(anyhow!("finalize rejected"));
        }
        Ok(())
    }
}

pub fn reply(message: &str) -> GenerationResponse {
    GenerationResponse {
        message: message.to_string(),
        kind: ResponseKind::FollowUp,
        dockerfile: None,
        run_command: None,
    }
}

pub fn dockerfile_reply(message: &str, dockerfile: &str, run_command: Option<&str>) -> GenerationResponse {
    GenerationResponse {
        message: message.to_string(),
        kind: ResponseKind::Dockerfile,
        dockerfile: Some(dockerfile.to_string()),
        run_command: run_command.map(str::to_string),
    }
}

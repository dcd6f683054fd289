#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use psrp_remote::{
    CommandPool, InvocationTarget, InvokeError, RawExecution, RemoteValue, Streams, Transport,
};
use serde_json::Value;

#[derive(Clone, Debug)]
pub enum Reply {
    Ran(RawExecution),
    RunFails(String),
}

#[derive(Debug, Default)]
pub struct Journal {
    pub opened: Vec<InvocationTarget>,
    pub closed: usize,
    pub scripts: Vec<String>,
}

/// In-memory transport answering each script from a table.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    open_error: Option<String>,
    close_error: Option<String>,
    pub journal: Arc<Mutex<Journal>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, script: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(script.to_string(), reply);
        self
    }

    pub fn output(self, script: &str, output: Vec<RemoteValue>) -> Self {
        self.reply(
            script,
            Reply::Ran(RawExecution {
                had_errors: false,
                output,
                streams: Streams::default(),
            }),
        )
    }

    pub fn unreachable(mut self, message: &str) -> Self {
        self.open_error = Some(message.to_string());
        self
    }

    pub fn failing_close(mut self, message: &str) -> Self {
        self.close_error = Some(message.to_string());
        self
    }

    pub fn scripts(&self) -> Vec<String> {
        self.journal.lock().unwrap().scripts.clone()
    }

    pub fn opened(&self) -> usize {
        self.journal.lock().unwrap().opened.len()
    }

    pub fn closed(&self) -> usize {
        self.journal.lock().unwrap().closed
    }
}

pub struct ScriptedPool {
    replies: Arc<Mutex<HashMap<String, Reply>>>,
    close_error: Option<String>,
    journal: Arc<Mutex<Journal>>,
}

impl Transport for ScriptedTransport {
    type Pool = ScriptedPool;

    fn open_pool(&self, target: &InvocationTarget) -> Result<ScriptedPool, InvokeError> {
        if let Some(message) = &self.open_error {
            return Err(InvokeError::Transport(message.clone()));
        }
        self.journal.lock().unwrap().opened.push(target.clone());
        Ok(ScriptedPool {
            replies: self.replies.clone(),
            close_error: self.close_error.clone(),
            journal: self.journal.clone(),
        })
    }
}

impl CommandPool for ScriptedPool {
    fn run(&mut self, script: &str) -> Result<RawExecution, InvokeError> {
        self.journal.lock().unwrap().scripts.push(script.to_string());
        match self.replies.lock().unwrap().get(script).cloned() {
            Some(Reply::Ran(raw)) => Ok(raw),
            Some(Reply::RunFails(message)) => Err(InvokeError::Transport(message)),
            None => Ok(RawExecution::default()),
        }
    }

    fn close(&mut self) -> Result<(), InvokeError> {
        self.journal.lock().unwrap().closed += 1;
        match &self.close_error {
            Some(message) => Err(InvokeError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

pub fn prim(value: Value) -> RemoteValue {
    RemoteValue::Primitive(value)
}

pub fn errored(messages: &[&str]) -> Reply {
    let mut streams = Streams::default();
    streams.error = messages.iter().map(|m| m.to_string()).collect();
    Reply::Ran(RawExecution {
        had_errors: true,
        output: vec![prim(Value::from("partial"))],
        streams,
    })
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Call-counting fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use repo_scout::backends::{Backends, DocumentFetcher, MetadataClient, QueryExecutor, VcsRunner};
use repo_scout::error::{BackendError, ProviderError};
use repo_scout::providers::AgentModels;
use repo_scout::types::{Message, Provider, ProviderResponse, SharedProvider, ToolDefinition};

// ============================================================================
// Models
// ============================================================================

/// Returns queued responses in order, then empty text.
pub struct ScriptedModel {
    name: &'static str,
    responses: Mutex<VecDeque<ProviderResponse>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(name: &'static str, responses: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            name,
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// A model that routes the same JSON object every round.
    pub fn repeating(name: &'static str, reply: &str, times: usize) -> Arc<Self> {
        Self::new(name, (0..times).map(|_| ProviderResponse::text(reply)).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedModel {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: Option<&[ToolDefinition]>,
        _system_prompt: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = messages.last() {
            self.prompts.lock().unwrap().push(last.content.clone());
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ProviderResponse::empty))
    }

    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// One scripted model per role.
pub struct Models {
    pub supervisor: Arc<ScriptedModel>,
    pub source_code: Arc<ScriptedModel>,
    pub git: Arc<ScriptedModel>,
    pub github: Arc<ScriptedModel>,
    pub docs: Arc<ScriptedModel>,
    pub response: Arc<ScriptedModel>,
}

impl Models {
    pub fn new(supervisor: Vec<ProviderResponse>) -> Self {
        Self {
            supervisor: ScriptedModel::new("supervisor", supervisor),
            source_code: ScriptedModel::new("source_code", Vec::new()),
            git: ScriptedModel::new("git", Vec::new()),
            github: ScriptedModel::new("github", Vec::new()),
            docs: ScriptedModel::new("docs", Vec::new()),
            response: ScriptedModel::new("response", vec![ProviderResponse::text("Synthesized answer.")]),
        }
    }

    pub fn with_supervisor(mut self, model: Arc<ScriptedModel>) -> Self {
        self.supervisor = model;
        self
    }

    pub fn with_source_code(mut self, responses: Vec<ProviderResponse>) -> Self {
        self.source_code = ScriptedModel::new("source_code", responses);
        self
    }

    pub fn with_git(mut self, responses: Vec<ProviderResponse>) -> Self {
        self.git = ScriptedModel::new("git", responses);
        self
    }

    pub fn with_github(mut self, responses: Vec<ProviderResponse>) -> Self {
        self.github = ScriptedModel::new("github", responses);
        self
    }

    pub fn with_docs(mut self, responses: Vec<ProviderResponse>) -> Self {
        self.docs = ScriptedModel::new("docs", responses);
        self
    }

    pub fn agent_models(&self) -> AgentModels {
        fn share(model: &Arc<ScriptedModel>) -> SharedProvider {
            Arc::clone(model) as SharedProvider
        }
        AgentModels {
            supervisor: share(&self.supervisor),
            source_code: share(&self.source_code),
            git: share(&self.git),
            github: share(&self.github),
            docs: share(&self.docs),
            response: share(&self.response),
        }
    }
}

// ============================================================================
// Backends
// ============================================================================

/// Queued backend results with a call counter and a record of what was asked.
#[derive(Default)]
pub struct Replies {
    queue: Mutex<VecDeque<Result<String, BackendError>>>,
    seen: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl Replies {
    pub fn new(queue: Vec<Result<String, BackendError>>) -> Self {
        Self {
            queue: Mutex::new(queue.into()),
            ..Default::default()
        }
    }

    fn next(&self, request: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.to_string());
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

pub struct FakeQuery(pub Replies);
pub struct FakeVcs(pub Replies);
pub struct FakeMetadata(pub Replies);
pub struct FakeDocs(pub Replies);

#[async_trait]
impl QueryExecutor for FakeQuery {
    async fn run(&self, _store: &Path, query: &str) -> Result<String, BackendError> {
        self.0.next(query)
    }
}

#[async_trait]
impl VcsRunner for FakeVcs {
    async fn run(&self, _workdir: &Path, command: &str) -> Result<String, BackendError> {
        self.0.next(command)
    }
}

#[async_trait]
impl MetadataClient for FakeMetadata {
    async fn search(&self, _repo: &str, query: &str) -> Result<String, BackendError> {
        self.0.next(query)
    }
}

#[async_trait]
impl DocumentFetcher for FakeDocs {
    async fn fetch<'a>(&self, _source: Option<&'a str>, query: &str) -> Result<String, BackendError> {
        self.0.next(query)
    }
}

/// Fakes for all four backends, kept so tests can read the counters afterwards.
pub struct FakeBackends {
    pub query: Arc<FakeQuery>,
    pub vcs: Arc<FakeVcs>,
    pub metadata: Arc<FakeMetadata>,
    pub docs: Arc<FakeDocs>,
}

impl Default for FakeBackends {
    fn default() -> Self {
        Self {
            query: Arc::new(FakeQuery(Replies::default())),
            vcs: Arc::new(FakeVcs(Replies::default())),
            metadata: Arc::new(FakeMetadata(Replies::default())),
            docs: Arc::new(FakeDocs(Replies::default())),
        }
    }
}

impl FakeBackends {
    pub fn with_query(mut self, queue: Vec<Result<String, BackendError>>) -> Self {
        self.query = Arc::new(FakeQuery(Replies::new(queue)));
        self
    }

    pub fn with_vcs(mut self, queue: Vec<Result<String, BackendError>>) -> Self {
        self.vcs = Arc::new(FakeVcs(Replies::new(queue)));
        self
    }

    pub fn backends(&self) -> Backends {
        Backends {
            query: Arc::clone(&self.query) as Arc<dyn QueryExecutor>,
            vcs: Arc::clone(&self.vcs) as Arc<dyn VcsRunner>,
            metadata: Arc::clone(&self.metadata) as Arc<dyn MetadataClient>,
            docs: Arc::clone(&self.docs) as Arc<dyn DocumentFetcher>,
        }
    }

    /// Calls per backend in agent priority order.
    pub fn calls(&self) -> [usize; 4] {
        [
            self.query.0.calls(),
            self.vcs.0.calls(),
            self.metadata.0.calls(),
            self.docs.0.calls(),
        ]
    }
}

// ============================================================================
// Responses
// ============================================================================

pub fn route(json: &str) -> ProviderResponse {
    ProviderResponse::text(json)
}

pub fn sql(query: &str) -> ProviderResponse {
    ProviderResponse::tool_call("GeneratedQuery", serde_json::json!({ "sql": query }))
}

pub fn git(command: &str) -> ProviderResponse {
    ProviderResponse::tool_call("GitCommand", serde_json::json!({ "command": command }))
}

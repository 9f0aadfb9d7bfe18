// The server state machine and dispatch loop.
//
// One task reads and classifies frames, one task writes queued outbound
// messages, and this loop owns everything in between: lifecycle state,
// open documents, cancellation bookkeeping, and the background indexing
// runs it spawns on `initialized`.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use lsp_types::{
    CompletionList, CompletionOptions, CompletionParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, HoverParams, HoverProviderCapability,
    InitializeParams, InitializeResult, LogMessageParams, MessageType, NumberOrString,
    ProgressParams, ProgressParamsValue, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, WorkDoneProgress, WorkDoneProgressBegin,
    WorkDoneProgressCreateParams, WorkDoneProgressEnd, WorkDoneProgressReport,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use apex_ast::Declaration;
use apex_indexer::{index_workspace_root, FileSystem, IndexRepository};

use crate::cancel::CancellationTracker;
use crate::documents::OpenDocuments;
use crate::features::completion::{self, TypeLookup};
use crate::features::{hover, resolve};
use crate::local::LocalIndex;
use crate::protocol::io::{MessageReader, MessageWriter};
use crate::protocol::message::{self, error_codes, Message, RequestId, ResponseError};
use crate::text::position_to_offset;

pub const SERVER_NAME: &str = "apex-language-server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Starting,
    Running,
    ShuttingDown,
}

/// Run the server over the given transport until the client disconnects or
/// sends `exit`. Returns the process exit code: 0 after an orderly
/// `shutdown`/`exit` handshake, 1 otherwise.
pub async fn run<R, W>(reader: R, writer: W, fs: Arc<dyn FileSystem>) -> anyhow::Result<i32>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outgoing, mut outbox) = mpsc::unbounded_channel::<Value>();
    let writer_task = tokio::spawn(async move {
        let mut writer = MessageWriter::new(writer);
        while let Some(queued) = outbox.recv().await {
            if let Err(err) = writer.write_message(&queued).await {
                tracing::error!(error = %err, "write failed, dropping outbound queue");
                break;
            }
        }
    });

    let mut server = LanguageServer::new(fs, outgoing);
    let mut reader = MessageReader::new(reader);
    let exit_code = loop {
        match reader.next_message().await {
            Ok(Some(incoming)) => match server.handle(incoming) {
                ControlFlow::Continue(()) => {}
                ControlFlow::Break(code) => break code,
            },
            Ok(None) => {
                tracing::info!("client closed the input stream");
                break server.disconnect_exit_code();
            }
            Err(err) => {
                tracing::error!(error = %err, "fatal transport error");
                break 1;
            }
        }
    };

    // Let queued responses drain before the process goes away.
    drop(server);
    let _ = writer_task.await;
    Ok(exit_code)
}

pub struct LanguageServer {
    state: ServerState,
    initialize_received: bool,
    fs: Arc<dyn FileSystem>,
    roots: Vec<PathBuf>,
    documents: Arc<OpenDocuments>,
    local_index: Arc<LocalIndex>,
    cancellations: CancellationTracker,
    repository: Arc<Mutex<Arc<IndexRepository>>>,
    outgoing: mpsc::UnboundedSender<Value>,
    next_server_request_id: i64,
    indexing_runs: u64,
}

#[derive(Debug, Deserialize)]
struct CancelParams {
    id: RequestId,
}

impl LanguageServer {
    pub fn new(fs: Arc<dyn FileSystem>, outgoing: mpsc::UnboundedSender<Value>) -> Self {
        let repository = Arc::new(IndexRepository::new(fs.clone(), Vec::new()));
        Self {
            state: ServerState::Starting,
            initialize_received: false,
            fs,
            roots: Vec::new(),
            documents: Arc::new(OpenDocuments::new()),
            local_index: Arc::new(LocalIndex::new()),
            cancellations: CancellationTracker::default(),
            repository: Arc::new(Mutex::new(repository)),
            outgoing,
            next_server_request_id: 1,
            indexing_runs: 0,
        }
    }

    fn handle(&mut self, incoming: Message) -> ControlFlow<i32> {
        match incoming {
            Message::Request { id, method, params } => {
                self.handle_request(id, &method, params);
                ControlFlow::Continue(())
            }
            Message::Notification { method, params } => self.handle_notification(&method, params),
            Message::ClientResponse { id, .. } => {
                tracing::trace!(%id, "client response consumed");
                ControlFlow::Continue(())
            }
            Message::ClientError { id, error } => {
                tracing::warn!(%id, ?error, "client rejected a server request");
                ControlFlow::Continue(())
            }
            Message::ParseError { id } => {
                self.send(message::response_error(
                    id.as_ref(),
                    error_codes::PARSE_ERROR,
                    "Parse error",
                ));
                ControlFlow::Continue(())
            }
        }
    }

    fn handle_request(&mut self, id: RequestId, method: &str, params: Value) {
        if self.cancellations.is_cancelled(&id) {
            tracing::debug!(%id, method, "request cancelled before execution");
            return self.respond_error(&id, error_codes::REQUEST_CANCELLED, "Request cancelled");
        }

        match self.state {
            ServerState::Starting => {
                if method == "initialize" && !self.initialize_received {
                    let outcome = self.handle_initialize(params);
                    self.respond(&id, outcome);
                } else if method == "initialize" {
                    self.respond_error(&id, error_codes::INVALID_REQUEST, "Invalid Request");
                } else {
                    self.respond_error(
                        &id,
                        error_codes::SERVER_NOT_INITIALIZED,
                        "Server not initialized",
                    );
                }
            }
            ServerState::ShuttingDown => {
                self.respond_error(&id, error_codes::INVALID_REQUEST, "Invalid Request");
            }
            ServerState::Running => match method {
                "shutdown" => {
                    tracing::info!("shutdown requested");
                    self.state = ServerState::ShuttingDown;
                    self.respond(&id, Ok(Value::Null));
                }
                "initialize" => {
                    self.respond_error(&id, error_codes::INVALID_REQUEST, "Invalid Request");
                }
                "textDocument/completion" => {
                    let outcome = self.guarded(method, |server| server.handle_completion(params));
                    self.respond(&id, outcome);
                }
                "textDocument/hover" => {
                    let outcome = self.guarded(method, |server| server.handle_hover(params));
                    self.respond(&id, outcome);
                }
                _ => {
                    self.respond_error(&id, error_codes::METHOD_NOT_FOUND, "Method not found");
                }
            },
        }
    }

    fn handle_notification(&mut self, method: &str, params: Value) -> ControlFlow<i32> {
        if method == "exit" {
            let code = if self.state == ServerState::ShuttingDown {
                0
            } else {
                1
            };
            tracing::info!(code, "exit notification received");
            return ControlFlow::Break(code);
        }

        match self.state {
            ServerState::Starting => {
                if method == "initialized" && self.initialize_received {
                    self.state = ServerState::Running;
                    self.start_indexing();
                } else {
                    tracing::debug!(method, "notification ignored before initialization");
                }
            }
            ServerState::Running => self.handle_running_notification(method, params),
            ServerState::ShuttingDown => {
                tracing::debug!(method, "notification ignored while shutting down");
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_running_notification(&mut self, method: &str, params: Value) {
        match method {
            "$/cancelRequest" => match serde_json::from_value::<CancelParams>(params) {
                Ok(cancel) => self.cancellations.cancel(cancel.id),
                Err(err) => tracing::debug!(error = %err, "malformed $/cancelRequest"),
            },
            "textDocument/didOpen" => {
                match serde_json::from_value::<DidOpenTextDocumentParams>(params) {
                    Ok(open) => {
                        let uri = open.text_document.uri.to_string();
                        self.local_index.update(&uri, &open.text_document.text);
                        self.documents.set(&uri, open.text_document.text);
                    }
                    Err(err) => tracing::warn!(error = %err, "malformed didOpen"),
                }
            }
            "textDocument/didChange" => {
                match serde_json::from_value::<DidChangeTextDocumentParams>(params) {
                    Ok(change) => {
                        let uri = change.text_document.uri.to_string();
                        // Full sync only: a change with a range would be
                        // incremental and is not accepted.
                        let full = change
                            .content_changes
                            .into_iter()
                            .filter(|change| change.range.is_none())
                            .next_back();
                        match full {
                            Some(full) => {
                                self.local_index.update(&uri, &full.text);
                                self.documents.set(&uri, full.text);
                            }
                            None => {
                                tracing::warn!(uri, "didChange without a full-sync change event")
                            }
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "malformed didChange"),
                }
            }
            "textDocument/didClose" => {
                match serde_json::from_value::<DidCloseTextDocumentParams>(params) {
                    Ok(close) => {
                        let uri = close.text_document.uri.to_string();
                        self.documents.remove(&uri);
                        self.local_index.remove(&uri);
                    }
                    Err(err) => tracing::warn!(error = %err, "malformed didClose"),
                }
            }
            "initialized" => {}
            _ => tracing::debug!(method, "notification ignored"),
        }
    }

    fn handle_initialize(&mut self, params: Value) -> Result<Value, ResponseError> {
        let params: InitializeParams = serde_json::from_value(params).map_err(invalid_params)?;
        self.roots = workspace_roots(&params);
        tracing::info!(roots = self.roots.len(), "initialize received");

        // A repository over whatever survived from earlier runs serves
        // queries until the fresh indexing pass replaces it.
        self.swap_repository(Arc::new(IndexRepository::new(
            self.fs.clone(),
            self.roots.clone(),
        )));
        self.initialize_received = true;

        let result = InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![".".to_string()]),
                    ..CompletionOptions::default()
                }),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..InitializeResult::default()
        };
        serde_json::to_value(result).map_err(internal_error)
    }

    /// Kick off the background indexing run announced through work-done
    /// progress. The dispatch loop never blocks on it.
    fn start_indexing(&mut self) {
        self.indexing_runs += 1;
        let token = format!("apex-lsp-indexing-{}", self.indexing_runs);
        let create_id = self.next_server_request_id;
        self.next_server_request_id += 1;

        let create = WorkDoneProgressCreateParams {
            token: NumberOrString::String(token.clone()),
        };
        self.send(message::server_request(
            create_id,
            "window/workDoneProgress/create",
            serde_json::to_value(create).unwrap_or(Value::Null),
        ));
        self.log_message(MessageType::INFO, "Indexing Apex workspace".to_string());

        let outgoing = self.outgoing.clone();
        let fs = self.fs.clone();
        let roots = self.roots.clone();
        let repository = Arc::clone(&self.repository);
        tokio::spawn(async move {
            send_progress(
                &outgoing,
                &token,
                WorkDoneProgress::Begin(WorkDoneProgressBegin {
                    title: "Indexing Apex workspace".to_string(),
                    cancellable: None,
                    message: None,
                    percentage: None,
                }),
            );

            let total = roots.len().max(1);
            let mut indexed = 0usize;
            let mut collected = 0usize;
            for (position, root) in roots.iter().enumerate() {
                let summary = index_workspace_root(fs.clone(), root).await;
                if summary.package_directories == 0 {
                    let warning = format!("{} is not an SFDX workspace", root.display());
                    let _ = outgoing.send(message::notification(
                        "window/logMessage",
                        serde_json::to_value(LogMessageParams {
                            typ: MessageType::WARNING,
                            message: warning,
                        })
                        .unwrap_or(Value::Null),
                    ));
                }
                indexed += summary.indexed();
                collected += summary.collected();
                send_progress(
                    &outgoing,
                    &token,
                    WorkDoneProgress::Report(WorkDoneProgressReport {
                        cancellable: None,
                        message: Some(root.display().to_string()),
                        percentage: Some(((position + 1) * 100 / total) as u32),
                    }),
                );
            }

            // The fresh repository replaces the previous one wholesale.
            let fresh = Arc::new(IndexRepository::new(fs, roots));
            match repository.lock() {
                Ok(mut slot) => *slot = fresh,
                Err(poisoned) => *poisoned.into_inner() = fresh,
            }

            send_progress(
                &outgoing,
                &token,
                WorkDoneProgress::End(WorkDoneProgressEnd {
                    message: Some(format!("Indexed {indexed} of {collected} files")),
                }),
            );
            let _ = outgoing.send(message::notification(
                "window/logMessage",
                serde_json::to_value(LogMessageParams {
                    typ: MessageType::INFO,
                    message: format!("Apex workspace indexing finished ({indexed} files)"),
                })
                .unwrap_or(Value::Null),
            ));
        });
    }

    fn handle_completion(&self, params: Value) -> Result<Value, ResponseError> {
        let params: CompletionParams = serde_json::from_value(params).map_err(invalid_params)?;
        let uri = params.text_document_position.text_document.uri.to_string();
        let position = params.text_document_position.position;

        let Some(text) = self.documents.get(&uri) else {
            let empty = CompletionList {
                is_incomplete: false,
                items: Vec::new(),
            };
            return serde_json::to_value(empty).map_err(internal_error);
        };

        let repository = self.repository_snapshot();
        let merged = self.merged_declarations(&uri, &repository);
        let lookup = RepositoryLookup {
            repository: &repository,
        };
        let list = completion::complete(&text, position, &merged, &lookup);
        serde_json::to_value(list).map_err(internal_error)
    }

    fn handle_hover(&self, params: Value) -> Result<Value, ResponseError> {
        let params: HoverParams = serde_json::from_value(params).map_err(invalid_params)?;
        let uri = params
            .text_document_position_params
            .text_document
            .uri
            .to_string();
        let position = params.text_document_position_params.position;

        let Some(text) = self.documents.get(&uri) else {
            return Ok(Value::Null);
        };
        let offset = position_to_offset(&text, position.line, position.character);
        let repository = self.repository_snapshot();
        let merged = self.merged_declarations(&uri, &repository);
        match resolve::resolve_symbol_at(&text, offset, &merged) {
            Some(symbol) => serde_json::to_value(hover::hover_for(&symbol)).map_err(internal_error),
            None => Ok(Value::Null),
        }
    }

    /// Local declarations first so same-named workspace types rank and
    /// resolve behind them.
    fn merged_declarations(
        &self,
        uri: &str,
        repository: &Arc<IndexRepository>,
    ) -> Vec<Declaration> {
        let mut merged = self.local_index.declarations(uri).as_ref().clone();
        merged.extend(repository.declarations());
        merged
    }

    fn repository_snapshot(&self) -> Arc<IndexRepository> {
        match self.repository.lock() {
            Ok(slot) => Arc::clone(&slot),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn swap_repository(&self, fresh: Arc<IndexRepository>) {
        match self.repository.lock() {
            Ok(mut slot) => *slot = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }

    /// Run a handler with a panic guard: a crashed handler answers with an
    /// internal error instead of taking the server down.
    fn guarded(
        &mut self,
        method: &str,
        handler: impl FnOnce(&Self) -> Result<Value, ResponseError>,
    ) -> Result<Value, ResponseError> {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(self))) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let details = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(method, panic = %details, "handler panicked");
                Err(ResponseError {
                    code: error_codes::INTERNAL_ERROR,
                    message: "Internal error".to_string(),
                    data: None,
                })
            }
        }
    }

    fn log_message(&self, typ: MessageType, text: String) {
        self.send(message::notification(
            "window/logMessage",
            serde_json::to_value(LogMessageParams { typ, message: text }).unwrap_or(Value::Null),
        ));
    }

    fn respond(&self, id: &RequestId, outcome: Result<Value, ResponseError>) {
        match outcome {
            Ok(result) => self.send(message::response_ok(id, result)),
            Err(err) => self.respond_error(id, err.code, &err.message),
        }
    }

    fn respond_error(&self, id: &RequestId, code: i64, text: &str) {
        self.send(message::response_error(Some(id), code, text));
    }

    fn send(&self, queued: Value) {
        if self.outgoing.send(queued).is_err() {
            tracing::warn!("outbound queue is gone, message dropped");
        }
    }

    fn disconnect_exit_code(&self) -> i32 {
        if self.state == ServerState::ShuttingDown {
            0
        } else {
            1
        }
    }
}

struct RepositoryLookup<'a> {
    repository: &'a IndexRepository,
}

impl TypeLookup for RepositoryLookup<'_> {
    fn indexed_type(&self, name: &str) -> Option<Declaration> {
        self.repository.indexed_type(name)
    }
}

fn send_progress(outgoing: &mpsc::UnboundedSender<Value>, token: &str, value: WorkDoneProgress) {
    let params = ProgressParams {
        token: NumberOrString::String(token.to_string()),
        value: ProgressParamsValue::WorkDone(value),
    };
    let _ = outgoing.send(message::notification(
        "$/progress",
        serde_json::to_value(params).unwrap_or(Value::Null),
    ));
}

fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    if let Some(folders) = &params.workspace_folders {
        let roots: Vec<PathBuf> = folders
            .iter()
            .filter_map(|folder| folder.uri.to_file_path().ok())
            .collect();
        if !roots.is_empty() {
            return roots;
        }
    }
    params
        .root_uri
        .as_ref()
        .and_then(|uri| uri.to_file_path().ok())
        .into_iter()
        .collect()
}

fn invalid_params(err: serde_json::Error) -> ResponseError {
    ResponseError {
        code: error_codes::INVALID_PARAMS,
        message: format!("Invalid params: {err}"),
        data: None,
    }
}

fn internal_error(err: serde_json::Error) -> ResponseError {
    ResponseError {
        code: error_codes::INTERNAL_ERROR,
        message: format!("Internal error: {err}"),
        data: None,
    }
}

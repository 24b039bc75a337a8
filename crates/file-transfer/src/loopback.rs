//! In-process file transfer server for tests.
//!
//! Implements [`QueryExecutor`] over an in-memory repository and runs a
//! real TCP data listener on loopback. Keys are single-use; partial
//! uploads keep the bytes received so far, as a resumable server would.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use queryft_protocol::command::group_arg;
use queryft_protocol::constants::{
    ERR_DATABASE_EMPTY_RESULT, ERR_FILE_ALREADY_EXISTS, ERR_FILE_INVALID_NAME,
    ERR_FILE_NOT_FOUND, ERR_FILE_TRANSFER_ID_IN_USE, ERR_FILE_TRANSFER_INVALID_ID,
};
use queryft_protocol::{
    Arg, ArgValue, Command, CommandName, QueryError, QueryExecutor, QueryFuture, Record, Response,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

type RepoKey = (u32, String);

/// Random bytes per key; keys go on the wire hex-encoded.
const KEY_BYTES: usize = 16;

fn transfer_key() -> String {
    hex::encode(rand::random::<[u8; KEY_BYTES]>())
}

#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, modified: i64 },
    Dir { modified: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Upload,
    Download,
}

#[derive(Debug)]
struct Pending {
    server_transfer_id: u32,
    file: RepoKey,
    direction: Direction,
    seek_position: u64,
    size: u64,
}

#[derive(Debug, Clone)]
struct Active {
    client_transfer_id: u32,
    file: RepoKey,
    direction: Direction,
    size: u64,
    size_done: u64,
    status: u32,
    started: Instant,
}

#[derive(Default)]
struct State {
    files: BTreeMap<RepoKey, Entry>,
    pending: HashMap<String, Pending>,
    active: BTreeMap<u32, Active>,
    next_server_id: u32,
    stall_downloads_after: Option<usize>,
}

/// Loopback control channel plus data listener.
pub(crate) struct LoopbackServer {
    state: Arc<Mutex<State>>,
    commands: Mutex<Vec<Command>>,
    data_port: u16,
    accept_task: JoinHandle<()>,
}

impl LoopbackServer {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let data_port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State {
            next_server_id: 1,
            ..State::default()
        }));

        let accept_task = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve_data(stream, state.clone()));
                }
            })
        };

        Self {
            state,
            commands: Mutex::new(Vec::new()),
            data_port,
            accept_task,
        }
    }

    pub(crate) fn data_port(&self) -> u16 {
        self.data_port
    }

    /// Seeds a file in the repository.
    pub(crate) fn put_file(&self, channel_id: u32, path: &str, data: &[u8]) {
        self.state.lock().unwrap().files.insert(
            (channel_id, path.to_string()),
            Entry::File {
                data: data.to_vec(),
                modified: 1_700_000_000,
            },
        );
    }

    pub(crate) fn file(&self, channel_id: u32, path: &str) -> Option<Vec<u8>> {
        match self
            .state
            .lock()
            .unwrap()
            .files
            .get(&(channel_id, path.to_string()))
        {
            Some(Entry::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub(crate) fn exists(&self, channel_id: u32, path: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .files
            .contains_key(&(channel_id, path.to_string()))
    }

    /// Makes downloads send `n` bytes and then hold the socket open.
    pub(crate) fn stall_downloads_after(&self, n: usize) {
        self.state.lock().unwrap().stall_downloads_after = Some(n);
    }

    /// Commands received so far, in order.
    pub(crate) fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    fn handle(&self, command: &Command) -> Result<Response, QueryError> {
        let mut state = self.state.lock().unwrap();
        match command.name {
            CommandName::InitUpload => init_upload(&mut state, command, self.data_port),
            CommandName::InitDownload => init_download(&mut state, command, self.data_port),
            CommandName::Stop => stop(&mut state, command),
            CommandName::List => list_transfers(&state),
            CommandName::GetFileList => list_files(&state, command),
            CommandName::GetFileInfo => file_info(&state, command),
            CommandName::DeleteFile => delete_files(&mut state, command),
            CommandName::RenameFile => rename_file(&mut state, command),
            CommandName::CreateDir => create_dir(&mut state, command),
        }
    }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

impl QueryExecutor for LoopbackServer {
    fn execute(&self, command: Command) -> QueryFuture<'_> {
        Box::pin(async move {
            let result = self.handle(&command);
            self.commands.lock().unwrap().push(command);
            result
        })
    }

    fn peer_addr(&self) -> SocketAddr {
        "127.0.0.1:10011".parse().unwrap()
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

// ---------------------------------------------------------------------------
// Control-channel handlers
// ---------------------------------------------------------------------------

fn num(command: &Command, key: &str) -> u64 {
    command.arg(key).and_then(ArgValue::as_num).unwrap_or(0)
}

fn text(command: &Command, key: &str) -> String {
    command
        .arg(key)
        .and_then(ArgValue::as_str)
        .unwrap_or_default()
        .to_string()
}

fn flag(command: &Command, key: &str) -> bool {
    command.arg(key).and_then(ArgValue::as_bool).unwrap_or(false)
}

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Record::new(),
    }
}

fn check_path(path: &str) -> Result<(), QueryError> {
    if !path.starts_with('/') || path.contains("..") {
        return Err(QueryError::server(ERR_FILE_INVALID_NAME, "invalid file name"));
    }
    Ok(())
}

fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("/", path),
    }
}

fn info_record(channel_id: u32, path: &str, entry: &Entry) -> Record {
    let (parent, name) = split_path(path);
    let (size, modified, kind) = match entry {
        Entry::File { data, modified } => (data.len() as u64, *modified, 1),
        Entry::Dir { modified } => (0, *modified, 0),
    };
    record(serde_json::json!({
        "cid": channel_id,
        "path": parent,
        "name": name,
        "size": size,
        "datetime": modified,
        "type": kind,
    }))
}

fn register(
    state: &mut State,
    command: &Command,
    file: RepoKey,
    direction: Direction,
    seek_position: u64,
    size: u64,
) -> Result<(u32, u32, String), QueryError> {
    let client_transfer_id = num(command, "clientftfid") as u32;
    if state
        .active
        .values()
        .any(|a| a.client_transfer_id == client_transfer_id)
    {
        return Err(QueryError::server(
            ERR_FILE_TRANSFER_ID_IN_USE,
            "file transfer id already in use",
        ));
    }

    let server_transfer_id = state.next_server_id;
    state.next_server_id += 1;
    let key = transfer_key();

    state.pending.insert(
        key.clone(),
        Pending {
            server_transfer_id,
            file: file.clone(),
            direction,
            seek_position,
            size,
        },
    );
    state.active.insert(
        server_transfer_id,
        Active {
            client_transfer_id,
            file,
            direction,
            size,
            size_done: seek_position,
            status: 0,
            started: Instant::now(),
        },
    );
    Ok((client_transfer_id, server_transfer_id, key))
}

fn init_upload(state: &mut State, command: &Command, port: u16) -> Result<Response, QueryError> {
    let file = (num(command, "cid") as u32, text(command, "name"));
    check_path(&file.1)?;
    let size = num(command, "size");
    let resume = flag(command, "resume");

    let seek_position = match state.files.get(&file) {
        Some(Entry::Dir { .. }) => {
            return Err(QueryError::server(ERR_FILE_INVALID_NAME, "path is a directory"));
        }
        Some(Entry::File { data, .. }) if resume && (data.len() as u64) <= size => {
            data.len() as u64
        }
        Some(Entry::File { .. }) if !flag(command, "overwrite") => {
            return Err(QueryError::server(ERR_FILE_ALREADY_EXISTS, "file already exists"));
        }
        _ => 0,
    };

    let (client_transfer_id, server_transfer_id, key) =
        register(state, command, file, Direction::Upload, seek_position, size)?;

    let mut rec = record(serde_json::json!({
        "clientftfid": client_transfer_id,
        "serverftfid": server_transfer_id,
        "ftkey": key,
        "port": port,
        "proto": 1,
    }));
    if resume {
        rec.insert("seekpos".into(), seek_position.into());
    }
    Ok(Response::new(vec![rec]))
}

fn init_download(
    state: &mut State,
    command: &Command,
    port: u16,
) -> Result<Response, QueryError> {
    let file = (num(command, "cid") as u32, text(command, "name"));
    check_path(&file.1)?;
    let seek_position = num(command, "seekpos");

    let size = match state.files.get(&file) {
        Some(Entry::File { data, .. }) => data.len() as u64,
        _ => return Err(QueryError::server(ERR_FILE_NOT_FOUND, "file not found")),
    };

    let (client_transfer_id, server_transfer_id, key) =
        register(state, command, file, Direction::Download, seek_position, size)?;

    Ok(Response::new(vec![record(serde_json::json!({
        "clientftfid": client_transfer_id,
        "serverftfid": server_transfer_id,
        "ftkey": key,
        "port": port,
        "size": size,
        "proto": 1,
    }))]))
}

fn stop(state: &mut State, command: &Command) -> Result<Response, QueryError> {
    let server_transfer_id = num(command, "serverftfid") as u32;
    let Some(active) = state.active.remove(&server_transfer_id) else {
        return Err(QueryError::server(
            ERR_FILE_TRANSFER_INVALID_ID,
            "invalid file transfer id",
        ));
    };
    state
        .pending
        .retain(|_, p| p.server_transfer_id != server_transfer_id);

    if flag(command, "delete") && active.direction == Direction::Upload {
        state.files.remove(&active.file);
    }
    Ok(Response::empty())
}

fn list_transfers(state: &State) -> Result<Response, QueryError> {
    if state.active.is_empty() {
        return Err(QueryError::server(
            ERR_DATABASE_EMPTY_RESULT,
            "database empty result set",
        ));
    }
    Ok(state
        .active
        .iter()
        .map(|(id, a)| {
            let (parent, name) = split_path(&a.file.1);
            let sender = u32::from(a.direction == Direction::Upload);
            record(serde_json::json!({
                "clientftfid": a.client_transfer_id,
                "serverftfid": id,
                "clid": 1,
                "path": parent,
                "name": name,
                "size": a.size,
                "sizedone": a.size_done,
                "sender": sender,
                "status": a.status,
                "current_speed": 0.0,
                "average_speed": 0.0,
                "runtime": a.started.elapsed().as_millis() as u64,
            }))
        })
        .collect())
}

fn list_files(state: &State, command: &Command) -> Result<Response, QueryError> {
    let channel_id = num(command, "cid") as u32;
    let dir = text(command, "path");
    let resp: Response = state
        .files
        .iter()
        .filter(|((cid, path), _)| *cid == channel_id && split_path(path).0 == dir)
        .map(|((cid, path), entry)| info_record(*cid, path, entry))
        .collect();
    if resp.is_empty() {
        return Err(QueryError::server(
            ERR_DATABASE_EMPTY_RESULT,
            "database empty result set",
        ));
    }
    Ok(resp)
}

fn group_file(group: &[Arg]) -> RepoKey {
    let channel_id = group_arg(group, "cid")
        .and_then(ArgValue::as_num)
        .unwrap_or(0) as u32;
    let path = group_arg(group, "name")
        .and_then(ArgValue::as_str)
        .unwrap_or_default()
        .to_string();
    (channel_id, path)
}

fn file_info(state: &State, command: &Command) -> Result<Response, QueryError> {
    command
        .groups()
        .map(|group| {
            let (cid, path) = group_file(group);
            state
                .files
                .get(&(cid, path.clone()))
                .map(|entry| info_record(cid, &path, entry))
                .ok_or_else(|| QueryError::server(ERR_FILE_NOT_FOUND, "file not found"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Response::new)
}

fn delete_files(state: &mut State, command: &Command) -> Result<Response, QueryError> {
    let targets: Vec<RepoKey> = command.groups().map(group_file).collect();
    if targets.iter().any(|t| !state.files.contains_key(t)) {
        return Err(QueryError::server(ERR_FILE_NOT_FOUND, "file not found"));
    }
    for target in targets {
        state.files.remove(&target);
    }
    Ok(Response::empty())
}

fn rename_file(state: &mut State, command: &Command) -> Result<Response, QueryError> {
    let channel_id = num(command, "cid") as u32;
    let source = (channel_id, text(command, "oldname"));
    let target_channel = match command.arg("tcid").and_then(ArgValue::as_num) {
        Some(tcid) => tcid as u32,
        None => channel_id,
    };
    let target = (target_channel, text(command, "newname"));
    check_path(&target.1)?;

    if state.files.contains_key(&target) {
        return Err(QueryError::server(ERR_FILE_ALREADY_EXISTS, "file already exists"));
    }
    let Some(entry) = state.files.remove(&source) else {
        return Err(QueryError::server(ERR_FILE_NOT_FOUND, "file not found"));
    };
    state.files.insert(target, entry);
    Ok(Response::empty())
}

fn create_dir(state: &mut State, command: &Command) -> Result<Response, QueryError> {
    let dir = (num(command, "cid") as u32, text(command, "dirname"));
    check_path(&dir.1)?;
    if state.files.contains_key(&dir) {
        return Err(QueryError::server(ERR_FILE_ALREADY_EXISTS, "file already exists"));
    }
    state.files.insert(
        dir,
        Entry::Dir {
            modified: 1_700_000_000,
        },
    );
    Ok(Response::empty())
}

// ---------------------------------------------------------------------------
// Data channel
// ---------------------------------------------------------------------------

async fn serve_data(mut stream: TcpStream, state: Arc<Mutex<State>>) {
    let mut key = [0u8; KEY_BYTES * 2];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut key)).await;
    if !matches!(read, Ok(Ok(_))) {
        return;
    }

    // Unknown or already-used keys are rejected by closing the socket.
    let Some(pending) = std::str::from_utf8(&key)
        .ok()
        .and_then(|k| state.lock().unwrap().pending.remove(k))
    else {
        return;
    };

    if let Some(active) = state
        .lock()
        .unwrap()
        .active
        .get_mut(&pending.server_transfer_id)
    {
        active.status = 1;
    }

    match pending.direction {
        Direction::Upload => receive_upload(stream, &state, pending).await,
        Direction::Download => send_download(stream, &state, pending).await,
    }
}

async fn receive_upload(mut stream: TcpStream, state: &Arc<Mutex<State>>, pending: Pending) {
    {
        let mut s = state.lock().unwrap();
        // Stopped between the key read and here.
        if !s.active.contains_key(&pending.server_transfer_id) {
            return;
        }
        let entry = s.files.entry(pending.file.clone()).or_insert(Entry::File {
            data: Vec::new(),
            modified: 0,
        });
        if let Entry::File { data, .. } = entry {
            data.truncate(pending.seek_position as usize);
        }
    }

    let remaining = pending.size.saturating_sub(pending.seek_position);
    let mut done: u64 = 0;
    let mut buf = vec![0u8; 4096];
    while done < remaining {
        let want = ((remaining - done) as usize).min(buf.len());
        let n = match stream.read(&mut buf[..want]).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        done += n as u64;

        let mut s = state.lock().unwrap();
        if !s.active.contains_key(&pending.server_transfer_id) {
            return;
        }
        if let Some(Entry::File { data, modified }) = s.files.get_mut(&pending.file) {
            data.extend_from_slice(&buf[..n]);
            *modified = chrono::Utc::now().timestamp();
        }
        if let Some(active) = s.active.get_mut(&pending.server_transfer_id) {
            active.size_done = pending.seek_position + done;
        }
    }

    if done == remaining {
        state
            .lock()
            .unwrap()
            .active
            .remove(&pending.server_transfer_id);
    }
}

async fn send_download(mut stream: TcpStream, state: &Arc<Mutex<State>>, pending: Pending) {
    let (payload, stall_after) = {
        let s = state.lock().unwrap();
        let data = match s.files.get(&pending.file) {
            Some(Entry::File { data, .. }) => data.clone(),
            _ => Vec::new(),
        };
        let start = (pending.seek_position as usize).min(data.len());
        (data[start..].to_vec(), s.stall_downloads_after)
    };

    if let Some(n) = stall_after {
        let _ = stream.write_all(&payload[..n.min(payload.len())]).await;
        std::future::pending::<()>().await;
    }

    if stream.write_all(&payload).await.is_ok() {
        let _ = stream.shutdown().await;
        state
            .lock()
            .unwrap()
            .active
            .remove(&pending.server_transfer_id);
    }
}

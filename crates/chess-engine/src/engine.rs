//! Engine-to-controller facade (spec.md §5, §6).
//!
//! [`ChessEngine`] owns the position, the hash tables, and a single search
//! worker thread. The worker is the only thread that ever touches the
//! tables or the position during a search; the caller drives it through
//! [`ChessEngine::start_search`]/[`ChessEngine::stop_search`] and drains
//! [`SearchEvent`]s from [`ChessEngine::next_event`]. There is no UCI
//! parsing here — that's an outer protocol layer's job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chess_core::{Move, PacnMove};

use crate::error::{ConfigError, EngineError, ParseError};
use crate::movegen::generate_moves;
use crate::search::{self, SearchInfo, SearchLimits, SearchResult, SearchTables};
use crate::Position;

const DEFAULT_HASH_MB: usize = 16;
const MIN_HASH_MB: usize = 1;

/// Options exposed through `set_option`. Hash size is validated and takes
/// effect on the next search; the rest are read by the caller as needed.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub ponder: bool,
    pub own_book: bool,
    pub contempt: i32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB,
            ponder: false,
            own_book: false,
            contempt: 0,
        }
    }
}

enum WorkerCommand {
    Search {
        position: Position,
        limits: SearchLimits,
        stop: Arc<AtomicBool>,
    },
    NewGame,
    Resize(usize),
}

/// A published event from the worker thread.
pub enum SearchEvent {
    /// One completed iterative-deepening iteration.
    Info(SearchInfo),
    /// The search has ended; no more `Info` events follow until the next
    /// `start_search`.
    Done(SearchResult),
}

/// Owns the engine's position and hash tables and runs searches on a
/// dedicated worker thread, per spec.md §5's single-worker-thread model.
pub struct ChessEngine {
    position: Position,
    options: EngineOptions,
    stop_flag: Arc<AtomicBool>,
    command_tx: Option<Sender<WorkerCommand>>,
    event_rx: Receiver<SearchEvent>,
    worker: Option<JoinHandle<()>>,
}

impl ChessEngine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let tables = SearchTables::new(options.hash_mb);
        let worker = thread::spawn(move || worker_loop(command_rx, event_tx, tables));

        Self {
            position: Position::startpos(),
            options,
            stop_flag: Arc::new(AtomicBool::new(false)),
            command_tx: Some(command_tx),
            event_rx,
            worker: Some(worker),
        }
    }

    /// Resets to `fen` (or the standard start position) and applies `moves`
    /// in PACN, per spec.md §6's `set_position(fen, moves)`.
    ///
    /// A malformed move string is a [`ParseError`]; a well-formed move that
    /// isn't legal in the resulting position is an
    /// [`EngineError::IllegalMove`] instead, per spec.md §7.
    pub fn set_position(&mut self, fen: &str, moves: &[String]) -> Result<(), EngineError> {
        let mut position = if fen.eq_ignore_ascii_case("startpos") {
            Position::startpos()
        } else {
            Position::from_fen(fen).map_err(ParseError::from)?
        };

        for mv_str in moves {
            let pacn = PacnMove::parse(mv_str)
                .ok_or_else(|| ParseError::Pacn(mv_str.clone()))?;
            let mv = find_move(&position, pacn)
                .ok_or_else(|| EngineError::IllegalMove(mv_str.clone()))?;
            position.make(mv);
        }

        self.position = position;
        Ok(())
    }

    /// Starts a search on a copy of the current position; the engine's own
    /// position is only updated once the search result is collected via
    /// [`ChessEngine::stop_search`].
    pub fn start_search(&mut self, mut limits: SearchLimits) {
        limits.ponder = limits.ponder || self.options.ponder;
        self.stop_flag.store(false, Ordering::Relaxed);
        let _ = self.sender().send(WorkerCommand::Search {
            position: self.position.clone(),
            limits,
            stop: Arc::clone(&self.stop_flag),
        });
    }

    /// Blocks for the next published event. Returns `None` once the worker
    /// thread has shut down.
    pub fn next_event(&self) -> Option<SearchEvent> {
        self.event_rx.recv().ok()
    }

    /// Signals cancellation and blocks until the worker reports its final
    /// result, applying the returned best move to the engine's position.
    pub fn stop_search(&mut self) -> SearchResult {
        self.stop_flag.store(true, Ordering::Relaxed);
        loop {
            match self.event_rx.recv() {
                Ok(SearchEvent::Done(result)) => {
                    if let Some(mv) = result.best_move {
                        self.position.make(mv);
                    }
                    return result;
                }
                Ok(SearchEvent::Info(_)) => continue,
                Err(_) => return SearchResult::default(),
            }
        }
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name {
            "Hash" => {
                let mb = parse_usize(name, value)?;
                if mb < MIN_HASH_MB {
                    return Err(ConfigError::HashSizeTooSmall(mb));
                }
                self.options.hash_mb = mb;
                let _ = self.sender().send(WorkerCommand::Resize(mb));
                Ok(())
            }
            "Ponder" => {
                self.options.ponder = parse_bool(name, value)?;
                Ok(())
            }
            "OwnBook" => {
                self.options.own_book = parse_bool(name, value)?;
                Ok(())
            }
            "Contempt" => {
                self.options.contempt = value
                    .parse()
                    .map_err(|_| invalid_value(name, value))?;
                Ok(())
            }
            other => Err(ConfigError::UnknownOption(other.to_string())),
        }
    }

    /// Clears every hash table and resets to the standard start position,
    /// per spec.md §6's `new_game()`.
    pub fn new_game(&mut self) {
        self.position = Position::startpos();
        let _ = self.sender().send(WorkerCommand::NewGame);
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    fn sender(&self) -> &Sender<WorkerCommand> {
        self.command_tx
            .as_ref()
            .expect("worker command channel open for the engine's lifetime")
    }
}

impl Default for ChessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ChessEngine {
    fn drop(&mut self) {
        // Dropping the sender closes the channel, which ends the worker's
        // recv loop; join it so the thread doesn't outlive the engine.
        self.command_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn find_move(position: &Position, pacn: PacnMove) -> Option<Move> {
    generate_moves(position)
        .as_slice()
        .iter()
        .find(|m| m.from() == pacn.from && m.to() == pacn.to && m.kind().promotion_piece() == pacn.promotion)
        .copied()
}

fn parse_usize(name: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| invalid_value(name, value))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid_value(name, value)),
    }
}

fn invalid_value(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn worker_loop(
    command_rx: Receiver<WorkerCommand>,
    event_tx: Sender<SearchEvent>,
    mut tables: SearchTables,
) {
    while let Ok(command) = command_rx.recv() {
        match command {
            WorkerCommand::Search {
                mut position,
                limits,
                stop,
            } => {
                let tx = event_tx.clone();
                let result = search::search(&mut position, &mut tables, &limits, &stop, |info| {
                    let _ = tx.send(SearchEvent::Info(info));
                });
                if event_tx.send(SearchEvent::Done(result)).is_err() {
                    return;
                }
            }
            WorkerCommand::NewGame => tables.new_game(),
            WorkerCommand::Resize(mb) => tables = SearchTables::new(mb),
        }
    }
}

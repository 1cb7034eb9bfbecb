//! Subordinate process sessions with pattern-matched reads.

use std::io::Write as _;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{ExpectError, Result};
use crate::pattern::{Match, Pattern};

/// Escape byte that ends an [`Session::interact`] hand-off (Ctrl-]).
pub const INTERACT_ESCAPE: u8 = 0x1d;

const READ_CHUNK: usize = 4096;

/// Outcome of one `expect` call. Callers must handle every variant; there is
/// no sentinel index for "nothing matched".
#[derive(Debug)]
pub enum ExpectOutcome {
	/// One candidate matched; the matched text was consumed from the buffer.
	Matched(Match),
	/// No candidate matched before the deadline.
	TimedOut,
	/// The subordinate's output stream ended before any candidate matched.
	StreamEnded,
}

/// Construction options for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Timeout applied when `expect` is called without an override.
	pub default_timeout: Duration,
	/// Mirror subordinate output to our stdout as it arrives.
	pub echo: bool,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			default_timeout: Duration::from_secs(30),
			echo: true,
		}
	}
}

#[derive(Debug)]
enum Backend {
	/// A real child process with reader tasks draining stdout and stderr.
	Child {
		child: Child,
		stdin: Option<ChildStdin>,
		rx: mpsc::UnboundedReceiver<Vec<u8>>,
	},
	/// Offline stand-in: every expectation matches its first candidate
	/// immediately and writes are logged instead of delivered.
	Pretend,
	/// Test backend fed by a [`ScriptHandle`].
	Piped {
		rx: mpsc::UnboundedReceiver<Vec<u8>>,
		sent: Arc<Mutex<Vec<String>>>,
	},
}

/// One controllable subordinate process (or its stand-in).
#[derive(Debug)]
pub struct Session {
	command_line: String,
	backend: Backend,
	buffer: String,
	default_timeout: Duration,
	echo: bool,
	closed: bool,
}

impl Session {
	/// Launches `program` with `args` and takes ownership of its stdio.
	///
	/// The child is killed when the session is dropped, so an interrupted
	/// orchestration cannot leave the tool running against the hardware.
	pub fn spawn(program: &str, args: &[String], opts: SessionOptions) -> Result<Self> {
		let command_line = render_command(program, args);
		info!(command = %command_line, "spawning");
		let mut child = Command::new(program)
			.args(args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|source| ExpectError::Launch {
				command: command_line.clone(),
				source,
			})?;

		let (tx, rx) = mpsc::unbounded_channel();
		if let Some(stdout) = child.stdout.take() {
			spawn_reader(stdout, tx.clone());
		}
		if let Some(stderr) = child.stderr.take() {
			spawn_reader(stderr, tx.clone());
		}
		let stdin = child.stdin.take();

		Ok(Self {
			command_line,
			backend: Backend::Child { child, stdin, rx },
			buffer: String::new(),
			default_timeout: opts.default_timeout,
			echo: opts.echo,
			closed: false,
		})
	}

	/// Creates an offline session that logs the command instead of running it.
	pub fn pretend(program: &str, args: &[String], opts: SessionOptions) -> Self {
		let command_line = render_command(program, args);
		info!(command = %command_line, "pretend: would spawn");
		Self {
			command_line,
			backend: Backend::Pretend,
			buffer: String::new(),
			default_timeout: opts.default_timeout,
			echo: opts.echo,
			closed: false,
		}
	}

	/// Creates a session whose output is scripted through the returned handle.
	pub fn piped(command_line: &str, opts: SessionOptions) -> (Self, ScriptHandle) {
		let (tx, rx) = mpsc::unbounded_channel();
		let sent = Arc::new(Mutex::new(Vec::new()));
		let session = Self {
			command_line: command_line.to_string(),
			backend: Backend::Piped {
				rx,
				sent: Arc::clone(&sent),
			},
			buffer: String::new(),
			default_timeout: opts.default_timeout,
			echo: opts.echo,
			closed: false,
		};
		(session, ScriptHandle { tx, sent })
	}

	/// The command line this session was created with, for diagnostics.
	pub fn command_line(&self) -> &str {
		&self.command_line
	}

	/// Returns `true` for the pretend backend.
	pub fn is_pretend(&self) -> bool {
		matches!(self.backend, Backend::Pretend)
	}

	/// Enables or disables mirroring of subordinate output to stdout.
	pub fn set_echo(&mut self, echo: bool) {
		self.echo = echo;
	}

	/// Waits until one of `patterns` matches newly arrived output.
	///
	/// The earliest-starting match wins; ties go to the lower candidate
	/// index. Matched text (and everything before it) is consumed. With no
	/// `timeout` the session default applies.
	pub async fn expect(&mut self, patterns: &[Pattern], timeout: Option<Duration>) -> Result<ExpectOutcome> {
		if self.closed {
			return Err(ExpectError::Closed(self.command_line.clone()));
		}
		let deadline = Instant::now() + timeout.unwrap_or(self.default_timeout);
		loop {
			if let Some(found) = scan(&mut self.buffer, patterns) {
				return Ok(ExpectOutcome::Matched(found));
			}
			let rx = match &mut self.backend {
				Backend::Child { rx, .. } | Backend::Piped { rx, .. } => rx,
				Backend::Pretend => {
					// Pretend sessions satisfy every expectation in order
					// and never block on wall-clock timeouts.
					if let Some(first) = patterns.first() {
						debug!(pattern = %first, "pretend: matched");
					}
					return Ok(ExpectOutcome::Matched(Match {
						index: 0,
						captures: Vec::new(),
					}));
				}
			};
			match tokio::time::timeout_at(deadline, rx.recv()).await {
				Ok(Some(chunk)) => {
					let text = String::from_utf8_lossy(&chunk);
					if self.echo {
						let mut out = std::io::stdout().lock();
						let _ = out.write_all(chunk.as_slice());
						let _ = out.flush();
					}
					self.buffer.push_str(&text);
				}
				Ok(None) => {
					// Stream closed; one final scan over what already arrived.
					if let Some(found) = scan(&mut self.buffer, patterns) {
						return Ok(ExpectOutcome::Matched(found));
					}
					return Ok(ExpectOutcome::StreamEnded);
				}
				Err(_) => return Ok(ExpectOutcome::TimedOut),
			}
		}
	}

	/// Writes `text` plus a newline to the subordinate's stdin.
	pub async fn send_line(&mut self, text: &str) -> Result<()> {
		let mut line = text.as_bytes().to_vec();
		line.push(b'\n');
		self.send_bytes(&line, text).await
	}

	/// Sends a control character (`send_control('t')` sends Ctrl-T).
	pub async fn send_control(&mut self, c: char) -> Result<()> {
		let byte = (c.to_ascii_uppercase() as u8) & 0x1f;
		self.send_bytes(&[byte], &format!("^{}", c.to_ascii_uppercase())).await
	}

	async fn send_bytes(&mut self, bytes: &[u8], rendered: &str) -> Result<()> {
		if self.closed {
			return Err(ExpectError::Closed(self.command_line.clone()));
		}
		match &mut self.backend {
			Backend::Child { stdin, .. } => {
				if let Some(stdin) = stdin {
					stdin.write_all(bytes).await?;
					stdin.flush().await?;
				}
				Ok(())
			}
			Backend::Pretend => {
				info!(input = rendered, "pretend: would send");
				Ok(())
			}
			Backend::Piped { sent, .. } => {
				if let Ok(mut log) = sent.lock() {
					log.push(rendered.to_string());
				}
				Ok(())
			}
		}
	}

	/// Hands the controlling terminal to the subordinate until Ctrl-].
	///
	/// Output echo is suppressed for the duration; the forwarding is raw and
	/// unstructured, so mirroring it through the transcript path would only
	/// duplicate every byte.
	pub async fn interact(&mut self) -> Result<()> {
		if self.closed {
			return Err(ExpectError::Closed(self.command_line.clone()));
		}
		let Backend::Child { stdin, rx, .. } = &mut self.backend else {
			info!("pretend: interactive session skipped");
			return Ok(());
		};

		let prev_echo = self.echo;
		self.echo = false;
		#[cfg(unix)]
		let _raw = raw_mode::RawModeGuard::enable()?;

		let mut term_in = tokio::io::stdin();
		let mut term_out = tokio::io::stdout();

		// Flush anything already buffered before going interactive.
		term_out.write_all(self.buffer.as_bytes()).await?;
		self.buffer.clear();

		let mut buf = [0u8; READ_CHUNK];
		loop {
			tokio::select! {
				read = term_in.read(&mut buf) => {
					let n = read?;
					if n == 0 {
						break;
					}
					let input = &buf[..n];
					if let Some(pos) = input.iter().position(|&b| b == INTERACT_ESCAPE) {
						if let Some(stdin) = stdin {
							stdin.write_all(&input[..pos]).await?;
							stdin.flush().await?;
						}
						break;
					}
					if let Some(stdin) = stdin {
						stdin.write_all(input).await?;
						stdin.flush().await?;
					}
				}
				chunk = rx.recv() => {
					match chunk {
						Some(chunk) => {
							term_out.write_all(&chunk).await?;
							term_out.flush().await?;
						}
						None => break,
					}
				}
			}
		}

		self.echo = prev_echo;
		Ok(())
	}

	/// Terminates the subordinate. Further matching or writing fails with
	/// [`ExpectError::Closed`].
	pub fn close(&mut self) {
		if let Backend::Child { child, .. } = &mut self.backend {
			let _ = child.start_kill();
		}
		self.closed = true;
	}
}

/// Test-side controller for a piped session, in the spirit of an in-memory
/// fake transport: inject output, close the stream, inspect what was sent.
pub struct ScriptHandle {
	tx: mpsc::UnboundedSender<Vec<u8>>,
	sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptHandle {
	/// Injects one line of subordinate output.
	pub fn push_line(&self, line: &str) {
		let mut bytes = line.as_bytes().to_vec();
		bytes.push(b'\n');
		let _ = self.tx.send(bytes);
	}

	/// Injects raw output without a trailing newline.
	pub fn push(&self, text: &str) {
		let _ = self.tx.send(text.as_bytes().to_vec());
	}

	/// Marks end-of-stream, as if the subordinate exited.
	pub fn close(self) {}

	/// Everything the session wrote to the subordinate so far.
	pub fn sent(&self) -> Vec<String> {
		self.sent.lock().map(|log| log.clone()).unwrap_or_default()
	}
}

fn render_command(program: &str, args: &[String]) -> String {
	let mut rendered = String::from(program);
	for arg in args {
		rendered.push(' ');
		if arg.contains(char::is_whitespace) {
			rendered.push('\'');
			rendered.push_str(arg);
			rendered.push('\'');
		} else {
			rendered.push_str(arg);
		}
	}
	rendered
}

fn spawn_reader<R>(mut reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
	R: AsyncRead + Unpin + Send + 'static,
{
	tokio::spawn(async move {
		let mut buf = [0u8; READ_CHUNK];
		loop {
			match reader.read(&mut buf).await {
				Ok(0) | Err(_) => break,
				Ok(n) => {
					if tx.send(buf[..n].to_vec()).is_err() {
						break;
					}
				}
			}
		}
	});
}

/// Finds the earliest-starting candidate match in `buffer` and consumes
/// through its end.
fn scan(buffer: &mut String, patterns: &[Pattern]) -> Option<Match> {
	let mut best: Option<(usize, usize, Match)> = None;
	for (index, pattern) in patterns.iter().enumerate() {
		let found = match pattern {
			Pattern::Exact(text) => buffer
				.find(text.as_str())
				.map(|start| (start, start + text.len(), Vec::new())),
			Pattern::Regex(re) => re.captures(buffer).map(|caps| {
				let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
				let groups = (1..caps.len())
					.map(|i| caps.get(i).map(|m| m.as_str().to_string()))
					.collect();
				(whole.0, whole.1, groups)
			}),
		};
		if let Some((start, end, captures)) = found {
			let better = match &best {
				Some((best_start, _, _)) => start < *best_start,
				None => true,
			};
			if better {
				best = Some((start, end, Match { index, captures }));
			}
		}
	}
	let (_, end, matched) = best?;
	buffer.drain(..end);
	Some(matched)
}

#[cfg(unix)]
mod raw_mode {
	//! Raw-mode guard for the interactive hand-off, restored on drop.

	use std::io::IsTerminal;
	use std::os::unix::io::AsRawFd;

	use termios::Termios;

	use crate::error::Result;

	pub(super) struct RawModeGuard {
		fd: i32,
		saved: Option<Termios>,
	}

	impl RawModeGuard {
		pub(super) fn enable() -> Result<Self> {
			let stdin = std::io::stdin();
			let fd = stdin.as_raw_fd();
			if !stdin.is_terminal() {
				// Piped stdin (tests, CI): nothing to restore.
				return Ok(Self { fd, saved: None });
			}
			let saved = Termios::from_fd(fd)?;
			let mut raw = saved;
			termios::cfmakeraw(&mut raw);
			termios::tcsetattr(fd, termios::TCSANOW, &raw)?;
			Ok(Self { fd, saved: Some(saved) })
		}
	}

	impl Drop for RawModeGuard {
		fn drop(&mut self) {
			if let Some(saved) = &self.saved {
				let _ = termios::tcsetattr(self.fd, termios::TCSAFLUSH, saved);
			}
		}
	}
}

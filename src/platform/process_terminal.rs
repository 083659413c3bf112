//! Raw-mode terminal controller backed by a character device.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, AtomicU16, Ordering},
    mpsc::{self, Receiver, RecvTimeoutError, Sender},
    Arc, Mutex, MutexGuard, PoisonError,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use libc::{self, c_int};
use signal_hook::iterator::Signals;

use crate::config::EnvConfig;
use crate::core::input_event::InputEvent;
use crate::core::terminal::Terminal;
use crate::error::TerminalError;
use crate::platform::key_decoder::{KeyDecoder, DEFAULT_ESCAPE_TIMEOUT};

pub const DEFAULT_DEVICE: &str = "/dev/tty";

/// Upper bound on how long the input thread blocks before re-checking the stop flag.
const POLL_INTERVAL_MS: i32 = 50;

const DEFAULT_COLUMNS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

const SHOW_CURSOR: &str = "\x1b[?25h";

type EventResult = Result<InputEvent, TerminalError>;

#[derive(Debug)]
struct WindowSize {
    columns: AtomicU16,
    rows: AtomicU16,
}

impl WindowSize {
    fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns: AtomicU16::new(columns),
            rows: AtomicU16::new(rows),
        }
    }

    fn get(&self) -> (u16, u16) {
        (
            self.columns.load(Ordering::SeqCst),
            self.rows.load(Ordering::SeqCst),
        )
    }

    fn set(&self, columns: u16, rows: u16) {
        self.columns.store(columns, Ordering::SeqCst);
        self.rows.store(rows, Ordering::SeqCst);
    }
}

fn read_winsize(fd: c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

fn poll_readable(fd: c_int, timeout_ms: i32) -> io::Result<bool> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    if result < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    if result == 0 {
        return Ok(false);
    }
    if (fds.revents & libc::POLLIN) != 0 {
        return Ok(true);
    }
    if (fds.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL)) != 0 {
        return Err(io::Error::other(format!(
            "poll(POLLIN) returned revents=0x{:x}",
            fds.revents
        )));
    }
    Ok(false)
}

fn read_fd(fd: c_int, buffer: &mut [u8]) -> io::Result<usize> {
    let result = unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len()) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(result as usize)
}

fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Raw mode: no canonical processing, echo, signal characters, or output post-processing.
fn raw_termios(original: &libc::termios) -> libc::termios {
    let mut raw = *original;
    raw.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON);
    raw.c_oflag &= !libc::OPOST;
    raw.c_cflag &= !(libc::CSIZE | libc::PARENB);
    raw.c_cflag |= libc::CS8;
    raw.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    raw.c_cc[libc::VMIN] = 1;
    raw.c_cc[libc::VTIME] = 0;
    raw
}

/// Identity of a device node, used to keep raw mode exclusive per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeviceId {
    dev: u64,
    ino: u64,
}

static ACTIVE_DEVICES: Mutex<Vec<DeviceId>> = Mutex::new(Vec::new());

fn active_devices() -> MutexGuard<'static, Vec<DeviceId>> {
    ACTIVE_DEVICES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Registration of a device in [`ACTIVE_DEVICES`], released on drop.
#[derive(Debug)]
struct DeviceClaim {
    id: DeviceId,
}

impl DeviceClaim {
    fn acquire(file: &File, label: &str) -> Result<Self, TerminalError> {
        let metadata = file
            .metadata()
            .map_err(|err| TerminalError::io("inspecting terminal device", err))?;
        let id = DeviceId {
            dev: metadata.dev(),
            ino: metadata.ino(),
        };
        let mut active = active_devices();
        if active.contains(&id) {
            return Err(TerminalError::DeviceBusy {
                device: label.to_string(),
            });
        }
        active.push(id);
        Ok(Self { id })
    }
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        let mut active = active_devices();
        if let Some(index) = active.iter().position(|id| *id == self.id) {
            active.swap_remove(index);
        }
    }
}

fn open_device(path: &Path, write: bool) -> Result<File, TerminalError> {
    OpenOptions::new()
        .read(!write)
        .write(write)
        .custom_flags(libc::O_NOCTTY)
        .open(path)
        .map_err(|err| TerminalError::io("opening terminal device", err))
}

#[derive(Debug)]
struct DeviceFiles {
    input: File,
    output: File,
}

/// One raw-mode acquisition. Present on a [`ProcessTerminal`] exactly while it is running.
struct Session {
    original_termios: libc::termios,
    _claim: DeviceClaim,
    events: Receiver<EventResult>,
    stop_flag: Arc<AtomicBool>,
    input_thread: Option<JoinHandle<()>>,
    resize_signal_handle: Option<signal_hook::iterator::Handle>,
    resize_thread: Option<JoinHandle<()>>,
}

impl Session {
    /// Stop both producers and wait for them.
    ///
    /// The input thread observes the flag within one poll interval; bytes it reads after that
    /// are dropped rather than delivered.
    fn stop_producers(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.resize_signal_handle.take() {
            handle.close();
        }
        if let Some(thread) = self.input_thread.take() {
            let _ = thread.join();
        }
        if let Some(thread) = self.resize_thread.take() {
            let _ = thread.join();
        }
    }
}

fn spawn_input_thread(
    input_fd: c_int,
    escape_timeout: Duration,
    events: Sender<EventResult>,
    stop_flag: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("rawline-input".to_string())
        .spawn(move || {
            let mut buffer = [0u8; 256];
            let mut decoder = KeyDecoder::new(escape_timeout);

            while !stop_flag.load(Ordering::SeqCst) {
                let timeout_ms = decoder.next_timeout_ms(Instant::now(), POLL_INTERVAL_MS);
                let decoded = match poll_readable(input_fd, timeout_ms) {
                    Ok(true) => match read_fd(input_fd, &mut buffer) {
                        Ok(0) => Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                        Ok(len) => Ok(decoder.process(&buffer[..len], Instant::now())),
                        Err(err)
                            if matches!(
                                err.kind(),
                                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                            ) =>
                        {
                            continue;
                        }
                        Err(err) => Err(err),
                    },
                    Ok(false) => Ok(decoder.flush_due(Instant::now())),
                    Err(err) => Err(err),
                };

                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }

                match decoded {
                    Ok(keys) => {
                        for key in keys {
                            log::trace!("decoded {:?} from {:?}", key.key, key.raw);
                            if events.send(Ok(InputEvent::Key(key))).is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        log::debug!("terminal input failed: {err}");
                        let _ = events.send(Err(TerminalError::io("reading terminal input", err)));
                        return;
                    }
                }
            }
        })
}

fn spawn_resize_thread(
    output_fd: c_int,
    size: Arc<WindowSize>,
    events: Sender<EventResult>,
    stop_flag: Arc<AtomicBool>,
) -> io::Result<(signal_hook::iterator::Handle, JoinHandle<()>)> {
    let mut signals = Signals::new([libc::SIGWINCH])?;
    let handle = signals.handle();

    let spawned = thread::Builder::new()
        .name("rawline-resize".to_string())
        .spawn(move || {
            for _ in signals.forever() {
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }
                let (columns, rows) = read_winsize(output_fd).unwrap_or_else(|| size.get());
                size.set(columns, rows);
                log::debug!("terminal resized to {columns}x{rows}");
                if events.send(Ok(InputEvent::Resize { columns, rows })).is_err() {
                    break;
                }
            }
        });

    match spawned {
        Ok(thread) => Ok((handle, thread)),
        Err(err) => {
            handle.close();
            Err(err)
        }
    }
}

/// Terminal controller for one character device, `/dev/tty` by default.
///
/// The device is opened on first use and kept open for the lifetime of the value, so
/// several start/stop cycles reuse it.
pub struct ProcessTerminal {
    device: PathBuf,
    label: String,
    files: Option<DeviceFiles>,
    escape_timeout: Duration,
    size: Arc<WindowSize>,
    session: Option<Session>,
    write_log_path: Option<PathBuf>,
    write_log_failed: bool,
}

impl ProcessTerminal {
    pub fn new() -> Self {
        Self::open(DEFAULT_DEVICE)
    }

    /// Controller for the device at `path`. Nothing is opened until first use.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let device = path.as_ref().to_path_buf();
        Self {
            label: device.display().to_string(),
            device,
            files: None,
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            size: Arc::new(WindowSize::new(DEFAULT_COLUMNS, DEFAULT_ROWS)),
            session: None,
            write_log_path: None,
            write_log_failed: false,
        }
    }

    /// Controller over already-open handles to one device.
    pub fn from_files(input: File, output: File) -> Self {
        let mut terminal = Self::open(format!("fd:{}", input.as_raw_fd()));
        terminal.files = Some(DeviceFiles { input, output });
        terminal
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        let mut terminal = Self::open(&config.device);
        terminal.escape_timeout = config.escape_timeout;
        terminal.write_log_path = config.write_log.clone();
        terminal
    }

    pub fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    /// Copy everything written to the device into the file at `path`.
    pub fn set_write_log(&mut self, path: Option<PathBuf>) {
        self.write_log_path = path;
        self.write_log_failed = false;
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Wait at most `timeout` for the next event.
    ///
    /// Returns `Ok(None)` when nothing arrived in time or the terminal is not running.
    pub fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>, TerminalError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        match session.events.recv_timeout(timeout) {
            Ok(event) => event.map(Some),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    /// A handle that puts the device back into its cooked mode, for use from a signal handler.
    ///
    /// While running this is the mode captured by `start`; otherwise it is the device's
    /// current mode. The handle refers to this controller's descriptors and must not be used
    /// after the controller is dropped.
    pub fn mode_restorer(&mut self) -> Result<ModeRestorer, TerminalError> {
        let captured = self.session.as_ref().map(|session| session.original_termios);
        let files = self.ensure_open()?;
        let fd = files.input.as_raw_fd();
        let termios = match captured {
            Some(termios) => termios,
            None => get_termios(fd).map_err(|err| TerminalError::mode("read", err))?,
        };
        Ok(ModeRestorer {
            fd,
            output_fd: files.output.as_raw_fd(),
            termios,
        })
    }

    fn ensure_open(&mut self) -> Result<&DeviceFiles, TerminalError> {
        let files = match self.files.take() {
            Some(files) => files,
            None => DeviceFiles {
                input: open_device(&self.device, false)?,
                output: open_device(&self.device, true)?,
            },
        };
        Ok(&*self.files.insert(files))
    }

    fn append_write_log(&mut self, data: &str) {
        if self.write_log_failed {
            return;
        }
        if let Some(path) = self.write_log_path.as_ref() {
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(data.as_bytes()));
            if let Err(err) = result {
                log::warn!("disabling write log {}: {err}", path.display());
                self.write_log_failed = true;
            }
        }
    }
}

impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessTerminal {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::warn!("failed to stop terminal on drop: {err}");
        }
    }
}

impl Terminal for ProcessTerminal {
    fn start(&mut self) -> Result<(), TerminalError> {
        if self.session.is_some() {
            return Err(TerminalError::AlreadyStarted);
        }

        let label = self.label.clone();
        let files = self.ensure_open()?;
        let input_fd = files.input.as_raw_fd();
        let output_fd = files.output.as_raw_fd();
        let claim = DeviceClaim::acquire(&files.input, &label)?;

        let original_termios =
            get_termios(input_fd).map_err(|err| TerminalError::mode("read", err))?;

        let (columns, rows) = read_winsize(output_fd).unwrap_or_else(|| {
            log::warn!("could not read size of {label}; assuming {DEFAULT_COLUMNS}x{DEFAULT_ROWS}");
            (DEFAULT_COLUMNS, DEFAULT_ROWS)
        });
        self.size.set(columns, rows);

        if let Err(err) = set_termios(input_fd, &raw_termios(&original_termios)) {
            // tcsetattr succeeds if any of the changes applied; undo whatever did.
            let _ = set_termios(input_fd, &original_termios);
            return Err(TerminalError::mode("enter raw", err));
        }

        let (events_tx, events_rx) = mpsc::channel();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let mut session = Session {
            original_termios,
            _claim: claim,
            events: events_rx,
            stop_flag: Arc::clone(&stop_flag),
            input_thread: None,
            resize_signal_handle: None,
            resize_thread: None,
        };

        let spawned = spawn_resize_thread(
            output_fd,
            Arc::clone(&self.size),
            events_tx.clone(),
            Arc::clone(&stop_flag),
        )
        .and_then(|(handle, thread)| {
            session.resize_signal_handle = Some(handle);
            session.resize_thread = Some(thread);
            spawn_input_thread(input_fd, self.escape_timeout, events_tx, stop_flag)
        });

        match spawned {
            Ok(thread) => session.input_thread = Some(thread),
            Err(err) => {
                session.stop_producers();
                let _ = set_termios(input_fd, &session.original_termios);
                return Err(TerminalError::io("starting terminal event threads", err));
            }
        }

        self.session = Some(session);
        log::debug!("raw mode entered on {label} ({columns}x{rows})");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TerminalError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session.stop_producers();

        let shown = self.write(SHOW_CURSOR);

        let restored = match self.files.as_ref() {
            Some(files) => {
                let input_fd = files.input.as_raw_fd();
                // Discard unread input so it does not leak into whatever reads the device next.
                let _ = unsafe { libc::tcflush(input_fd, libc::TCIFLUSH) };
                set_termios(input_fd, &session.original_termios)
                    .map_err(|err| TerminalError::mode("restore", err))
            }
            None => Ok(()),
        };

        drop(session);
        log::debug!("raw mode left on {}", self.label);
        restored.and(shown)
    }

    fn next_event(&mut self) -> Result<Option<InputEvent>, TerminalError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(None);
        };
        match session.events.recv() {
            Ok(event) => event.map(Some),
            Err(_) => Ok(None),
        }
    }

    fn write(&mut self, data: &str) -> Result<(), TerminalError> {
        if data.is_empty() {
            return Ok(());
        }
        let files = self.ensure_open()?;
        let mut output = &files.output;
        output
            .write_all(data.as_bytes())
            .and_then(|()| output.flush())
            .map_err(|err| TerminalError::io("writing to terminal", err))?;
        self.append_write_log(data);
        Ok(())
    }

    fn columns(&self) -> u16 {
        self.size.get().0
    }

    fn rows(&self) -> u16 {
        self.size.get().1
    }
}

/// Restores a device's pre-raw mode. Safe to call from any thread.
#[derive(Clone, Copy)]
pub struct ModeRestorer {
    fd: c_int,
    output_fd: c_int,
    termios: libc::termios,
}

impl ModeRestorer {
    /// Show the cursor and put the original mode back. Best-effort and non-panicking.
    pub fn restore(&self) -> io::Result<()> {
        let _ = unsafe {
            libc::write(
                self.output_fd,
                SHOW_CURSOR.as_ptr() as *const libc::c_void,
                SHOW_CURSOR.len(),
            )
        };
        set_termios(self.fd, &self.termios)
    }
}

impl std::fmt::Debug for ModeRestorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeRestorer")
            .field("fd", &self.fd)
            .finish_non_exhaustive()
    }
}

/// Signal handler guard for cleanup hooks.
pub struct SignalHookGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for SignalHookGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Run `cleanup` once on SIGTERM, SIGHUP or SIGQUIT, then let the signal take its default
/// effect.
///
/// Raw mode disables the keyboard signal characters, so these only arrive from outside the
/// terminal. Pair with [`ProcessTerminal::mode_restorer`].
pub fn install_signal_handlers<F>(cleanup: F) -> io::Result<SignalHookGuard>
where
    F: Fn() + Send + Sync + 'static,
{
    let mut signals = Signals::new([libc::SIGTERM, libc::SIGHUP, libc::SIGQUIT])?;
    let handle = signals.handle();
    let ran = AtomicBool::new(false);

    let thread = thread::Builder::new()
        .name("rawline-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if !ran.swap(true, Ordering::SeqCst) {
                    cleanup();
                }
                log::debug!("re-raising signal {signal} after cleanup");
                if let Err(err) = signal_hook::low_level::emulate_default_handler(signal) {
                    log::warn!("failed to apply default action for signal {signal}: {err}");
                }
            }
        });

    match thread {
        Ok(thread) => Ok(SignalHookGuard {
            handle,
            thread: Some(thread),
        }),
        Err(err) => {
            handle.close();
            Err(err)
        }
    }
}

//! In-memory WinRM host for integration tests.
//!
//! Decodes the command lines the engine sends and plays a tiny subset of
//! PowerShell: `Write-Host`, `echo`, `$host.ui.WriteErrorLine`, `exit`,
//! `[IntPtr]::size`, `ipconfig`, `dir`, and bare numbers. Temp files
//! written through stdin are kept in memory.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use winrm_ps::execution::POWERSHELL_32BIT;
use winrm_ps::{
    CommandEncoder, CommandId, OutputFragment, OutputStream, ReceiveResponse, ShellId, Transport,
    TransportError, MALFORMED_COMMAND_EXIT_CODE,
};

/// Same limit the engine uses by default.
pub const REMOTE_MAX_COMMAND_LENGTH: usize = 8155;

/// Output is cut into fragments of at most this many bytes.
const FRAGMENT_BYTES: usize = 5;

pub fn clixml_error(message: &str) -> String {
    format!(
        "#< CLIXML\r\n<Objs Version=\"1.1.0.1\" \
         xmlns=\"http://schemas.microsoft.com/powershell/2004/04\">\
         <S S=\"Error\">{message}_x000D__x000A_</S></Objs>"
    )
}

enum Program {
    /// Output events and exit code, fixed at submit time.
    Finished(Vec<(OutputStream, String)>, u64),
    /// Writes decoded stdin lines to a temp file once input ends.
    Writer(String),
}

struct RunningCommand {
    program: Program,
    stdin: Vec<u8>,
    stdin_closed: bool,
    responses: Option<VecDeque<ReceiveResponse>>,
}

#[derive(Default)]
struct HostState {
    next_id: u64,
    open_shells: Vec<String>,
    shells_created: usize,
    shells_deleted: usize,
    commands: HashMap<String, RunningCommand>,
    command_lines: Vec<String>,
    inputs: Vec<(Vec<u8>, bool)>,
    temp_files: HashMap<String, Vec<u8>>,
    removals: usize,
}

/// Fake remote host implementing [`Transport`].
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
    fail_cleanup: bool,
    fail_delete_shell: bool,
    sever_on_receive: bool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `Remove-Item` exit with 1.
    pub fn failing_cleanup(mut self) -> Self {
        self.fail_cleanup = true;
        self
    }

    /// Make `delete_shell` fail.
    pub fn failing_shell_delete(mut self) -> Self {
        self.fail_delete_shell = true;
        self
    }

    /// Fail every receive with a connection error.
    pub fn severed(mut self) -> Self {
        self.sever_on_receive = true;
        self
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.state.lock().unwrap().command_lines.clone()
    }

    pub fn inputs(&self) -> Vec<(Vec<u8>, bool)> {
        self.state.lock().unwrap().inputs.clone()
    }

    pub fn temp_file_names(&self) -> Vec<String> {
        self.state.lock().unwrap().temp_files.keys().cloned().collect()
    }

    pub fn removals(&self) -> usize {
        self.state.lock().unwrap().removals
    }

    pub fn shells_created(&self) -> usize {
        self.state.lock().unwrap().shells_created
    }

    pub fn shells_deleted(&self) -> usize {
        self.state.lock().unwrap().shells_deleted
    }

    pub fn open_shells(&self) -> usize {
        self.state.lock().unwrap().open_shells.len()
    }

    fn submit(&self, state: &mut HostState, line: &str) -> Program {
        if line.len() > REMOTE_MAX_COMMAND_LENGTH {
            return Program::Finished(
                vec![(OutputStream::Stderr, "The command line is too long.\r\n".into())],
                1,
            );
        }

        let bits = if line.starts_with(POWERSHELL_32BIT) { 4 } else { 8 };

        if let Some((_, path)) = line.split_once(" -File ") {
            let name = path
                .trim_matches('"')
                .trim_start_matches(r"%TEMP%\")
                .to_string();
            return match state.temp_files.get(&name) {
                Some(bytes) => {
                    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                    let script = String::from_utf8_lossy(bytes).into_owned();
                    interpret(&script, bits)
                }
                None => Program::Finished(
                    vec![(
                        OutputStream::Stderr,
                        format!("The argument '{name}' to the -File parameter does not exist.\r\n"),
                    )],
                    MALFORMED_COMMAND_EXIT_CODE,
                ),
            };
        }

        let Some(script) = CommandEncoder::decode_script(line) else {
            return Program::Finished(
                vec![(
                    OutputStream::Stderr,
                    "'command' is not recognized as an internal or external command.\r\n".into(),
                )],
                1,
            );
        };

        if script.is_empty() {
            return Program::Finished(
                vec![(
                    OutputStream::Stderr,
                    "Cannot process the command because of a missing parameter. \
                     A command must follow -Command.\r\n"
                        .into(),
                )],
                MALFORMED_COMMAND_EXIT_CODE,
            );
        }

        if script.contains("[Console]::In.ReadLine()") {
            return Program::Writer(temp_name(&script));
        }

        if script.starts_with("Remove-Item") {
            state.removals += 1;
            if self.fail_cleanup {
                return Program::Finished(vec![(OutputStream::Stderr, clixml_error("denied"))], 1);
            }
            state.temp_files.remove(&temp_name(&script));
            return Program::Finished(Vec::new(), 0);
        }

        interpret(&script, bits)
    }
}

fn temp_name(script: &str) -> String {
    script
        .split_once("Join-Path $env:TEMP '")
        .and_then(|(_, rest)| rest.split_once('\''))
        .map(|(name, _)| name.to_string())
        .unwrap_or_default()
}

fn quoted(arg: &str) -> String {
    arg.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

fn interpret(script: &str, bits: u8) -> Program {
    let mut events = Vec::new();
    let mut failed = false;

    for line in script.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(code) = line.strip_prefix("exit ") {
            return Program::Finished(events, code.trim().parse().unwrap_or(1));
        } else if let Some(arg) = line.strip_prefix("Write-Host ") {
            events.push((OutputStream::Stdout, format!("{}\n", quoted(arg))));
        } else if let Some(arg) = line.strip_prefix("echo ") {
            events.push((OutputStream::Stdout, format!("{}\r\n", quoted(arg))));
        } else if let Some(arg) = line
            .strip_prefix("$host.ui.WriteErrorLine(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            events.push((OutputStream::Stderr, clixml_error(&quoted(arg))));
        } else if line == "[IntPtr]::size" {
            events.push((OutputStream::Stdout, format!("{bits}\r\n")));
        } else if line == "ipconfig" {
            events.push((OutputStream::Stdout, "\r\nWindows IP Configuration\r\n\r\n".into()));
        } else if let Some(args) = line.strip_prefix("dir ") {
            if args.trim().starts_with('/') {
                events.push((
                    OutputStream::Stderr,
                    clixml_error(&format!("Cannot find path '{}'", args.trim())),
                ));
                failed = true;
            }
        } else if line.chars().all(|c| c.is_ascii_digit()) {
            let number = line.trim_start_matches('0');
            let number = if number.is_empty() { "0" } else { number };
            events.push((OutputStream::Stdout, format!("{number}\r\n")));
        } else {
            events.push((
                OutputStream::Stderr,
                clixml_error(&format!("The term '{line}' is not recognized")),
            ));
            failed = true;
        }
    }

    Program::Finished(events, u64::from(failed))
}

/// Cut events into fragments spread over several receive responses,
/// starting with an empty one.
fn responses(events: Vec<(OutputStream, String)>, exit_code: u64) -> VecDeque<ReceiveResponse> {
    let mut sequences: HashMap<OutputStream, u64> = HashMap::new();
    let mut fragments = Vec::new();
    for (stream, text) in events {
        for chunk in text.as_bytes().chunks(FRAGMENT_BYTES) {
            let sequence = sequences.entry(stream).or_insert(0);
            fragments.push(OutputFragment::new(stream, chunk.to_vec(), *sequence));
            *sequence += 1;
        }
    }

    let mut queue = VecDeque::new();
    queue.push_back(ReceiveResponse::pending());
    let mut batches: Vec<Vec<OutputFragment>> = fragments.chunks(3).map(<[_]>::to_vec).collect();
    let last = batches.pop().unwrap_or_default();
    for batch in batches {
        queue.push_back(ReceiveResponse::output(batch));
    }
    queue.push_back(ReceiveResponse::done(last, exit_code));
    queue
}

#[async_trait]
impl Transport for FakeHost {
    async fn create_shell(&self) -> Result<ShellId, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("shell-{}", state.next_id);
        state.open_shells.push(id.clone());
        state.shells_created += 1;
        Ok(ShellId::new(id))
    }

    async fn send_command(
        &self,
        shell: &ShellId,
        command_line: &str,
    ) -> Result<CommandId, TransportError> {
        let mut state = self.state.lock().unwrap();
        if !state.open_shells.iter().any(|s| s == shell.as_str()) {
            return Err(TransportError::Protocol(format!("unknown shell {shell}")));
        }
        state.command_lines.push(command_line.to_string());
        let program = self.submit(&mut state, command_line);

        state.next_id += 1;
        let id = format!("command-{}", state.next_id);
        state.commands.insert(
            id.clone(),
            RunningCommand {
                program,
                stdin: Vec::new(),
                stdin_closed: false,
                responses: None,
            },
        );
        Ok(CommandId::new(id))
    }

    async fn receive(
        &self,
        _shell: &ShellId,
        command: &CommandId,
    ) -> Result<ReceiveResponse, TransportError> {
        if self.sever_on_receive {
            return Err(TransportError::Connection("connection reset by peer".into()));
        }

        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        let running = state
            .commands
            .get_mut(command.as_str())
            .ok_or_else(|| TransportError::Protocol(format!("unknown command {command}")))?;

        if running.responses.is_none() {
            let (events, exit_code) = match &running.program {
                Program::Finished(events, exit_code) => (events.clone(), *exit_code),
                Program::Writer(name) => {
                    if !running.stdin_closed {
                        return Ok(ReceiveResponse::pending());
                    }
                    let text = String::from_utf8_lossy(&running.stdin).into_owned();
                    let file = state.temp_files.entry(name.clone()).or_default();
                    for line in text.lines().filter(|l| !l.is_empty()) {
                        let bytes = BASE64
                            .decode(line)
                            .map_err(|e| TransportError::Protocol(e.to_string()))?;
                        file.extend_from_slice(&bytes);
                    }
                    (Vec::new(), 0)
                }
            };
            running.responses = Some(responses(events, exit_code));
        }

        Ok(running
            .responses
            .as_mut()
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }

    async fn send_input(
        &self,
        _shell: &ShellId,
        command: &CommandId,
        data: &[u8],
        end_of_input: bool,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.inputs.push((data.to_vec(), end_of_input));
        let running = state
            .commands
            .get_mut(command.as_str())
            .ok_or_else(|| TransportError::Protocol(format!("unknown command {command}")))?;
        if running.stdin_closed {
            return Err(TransportError::Protocol("stdin already closed".into()));
        }
        running.stdin.extend_from_slice(data);
        running.stdin_closed = end_of_input;
        Ok(())
    }

    async fn signal_terminate(
        &self,
        _shell: &ShellId,
        command: &CommandId,
    ) -> Result<(), TransportError> {
        self.state.lock().unwrap().commands.remove(command.as_str());
        Ok(())
    }

    async fn delete_shell(&self, shell: &ShellId) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.open_shells.retain(|s| s != shell.as_str());
        state.shells_deleted += 1;
        if self.fail_delete_shell {
            return Err(TransportError::Connection("shell delete timed out".into()));
        }
        Ok(())
    }
}

/// Executor over `host` with fast polling.
pub fn executor(host: &std::sync::Arc<FakeHost>) -> winrm_ps::PowerShellExecutor<FakeHost> {
    winrm_ps::PowerShellExecutor::new(std::sync::Arc::clone(host)).poll_policy(winrm_ps::PollPolicy {
        poll_interval: std::time::Duration::from_millis(1),
        max_poll_interval: std::time::Duration::from_millis(2),
        command_timeout: Some(std::time::Duration::from_secs(10)),
    })
}

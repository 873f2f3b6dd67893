// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Invocation of external programs.

The pipeline never spawns processes directly. Instead it goes through the
[ExternalTool] trait, which allows swapping in a scripted implementation in
tests.
*/

use {
    crate::error::{PackagerError, Result},
    log::debug,
    std::time::{Duration, Instant},
};

/// Captured result of running an external program.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ToolOutput {
    /// Exit code. [None] if the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// Whether the process exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Both streams, stdout first.
    pub fn combined_lossy(&self) -> String {
        format!("{}{}", self.stdout_lossy(), self.stderr_lossy())
    }
}

/// Something that runs a program and captures its output.
pub trait ExternalTool {
    /// Run `program` with `args` to completion.
    ///
    /// A non-zero exit is not an error at this layer. Errors are reserved for
    /// failing to run the program at all.
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput>;
}

/// Runs programs as child processes via `duct`.
#[derive(Clone, Debug, Default)]
pub struct DuctTool {
    timeout: Option<Duration>,
}

impl DuctTool {
    /// Kill programs that do not exit within `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ExternalTool for DuctTool {
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
        debug!("invoking {} with args: {:?}", program, args);

        let expression = duct::cmd(program, args)
            .stdout_capture()
            .stderr_capture()
            .unchecked();

        let output = match self.timeout {
            None => expression
                .run()
                .map_err(|e| PackagerError::ExternalToolSpawn(program.to_string(), e))?,
            Some(timeout) => {
                let handle = expression
                    .start()
                    .map_err(|e| PackagerError::ExternalToolSpawn(program.to_string(), e))?;
                let deadline = Instant::now() + timeout;

                loop {
                    if let Some(output) = handle
                        .try_wait()
                        .map_err(|e| PackagerError::ExternalToolSpawn(program.to_string(), e))?
                    {
                        break output.clone();
                    }

                    if Instant::now() >= deadline {
                        handle.kill()?;
                        return Err(PackagerError::ExternalToolTimeout(
                            program.to_string(),
                            timeout.as_secs(),
                        ));
                    }

                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        };

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use {super::*, std::cell::RefCell, std::collections::VecDeque};

    /// An [ExternalTool] replaying canned outputs and recording invocations.
    #[derive(Default)]
    pub struct FakeTool {
        pub invocations: RefCell<Vec<(String, Vec<String>)>>,
        pub outputs: RefCell<VecDeque<Result<ToolOutput>>>,
    }

    impl FakeTool {
        pub fn with_outputs(outputs: impl IntoIterator<Item = Result<ToolOutput>>) -> Self {
            Self {
                invocations: RefCell::new(vec![]),
                outputs: RefCell::new(outputs.into_iter().collect()),
            }
        }
    }

    impl ExternalTool for FakeTool {
        fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
            self.invocations
                .borrow_mut()
                .push((program.to_string(), args.to_vec()));

            self.outputs
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(ToolOutput::default()))
        }
    }
}

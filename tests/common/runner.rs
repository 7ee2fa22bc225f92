use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mobile_pilot::device::adb::{CommandOutput, CommandRunner};
use mobile_pilot::error::{PilotError, PilotResult};

/// `CommandRunner` answering from a table keyed by the joined argument list.
/// Unknown commands exit with status 1.
#[derive(Default)]
pub struct FakeRunner {
    responses: HashMap<String, CommandOutput>,
    spawn_fails: bool,
    calls: Rc<RefCell<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, args: &str, output: CommandOutput) -> Self {
        self.responses.insert(args.to_string(), output);
        self
    }

    /// Fail every call as if `adb` were not on PATH.
    pub fn unspawnable(mut self) -> Self {
        self.spawn_fails = true;
        self
    }

    pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.calls)
    }

    /// Runner that knows one device with the given packages installed.
    pub fn with_device(serial: &str, model: &str, release: &str, packages: &[&str]) -> Self {
        let listing: String = packages.iter().map(|p| format!("package:{}\n", p)).collect();
        Self::new()
            .respond(
                &format!("-s {} shell getprop ro.product.model", serial),
                CommandOutput::ok(format!("{}\n", model)),
            )
            .respond(
                &format!("-s {} shell getprop ro.build.version.release", serial),
                CommandOutput::ok(format!("{}\n", release)),
            )
            .respond(
                &format!("-s {} shell pm list packages", serial),
                CommandOutput::ok(listing),
            )
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> PilotResult<CommandOutput> {
        let key = args.join(" ");
        self.calls.borrow_mut().push(format!("{} {}", program, key));
        if self.spawn_fails {
            return Err(PilotError::CommandSpawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }
        Ok(self
            .responses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failed(1, "error: device not found")))
    }
}

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use daybook_core::backend::MemoryService;
use daybook_core::clock::ManualClock;
use daybook_core::confirm::ConfirmService;
use daybook_core::{Config, NoticeSlot, Runtime, Workspace};
use futures::executor::LocalPool;
use futures::future::{self, LocalBoxFuture};
use tracing_subscriber::EnvFilter;

pub const PASSWORD: &str = "secret1";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Answers confirmations from a queue; answers `false` when it runs dry.
#[derive(Default)]
pub struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn answer(&self, accepted: bool) {
        self.answers.borrow_mut().push_back(accepted);
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl ConfirmService for ScriptedConfirm {
    fn confirm(&self, message: &str) -> LocalBoxFuture<'static, bool> {
        self.asked.borrow_mut().push(message.to_string());
        let accepted = self.answers.borrow_mut().pop_front().unwrap_or(false);
        Box::pin(future::ready(accepted))
    }
}

/// One service, any number of client workspaces, one executor.
pub struct Harness {
    pub pool: LocalPool,
    pub service: MemoryService,
    pub clock: Rc<ManualClock>,
    pub config: Config,
}

pub struct Client {
    pub workspace: Workspace,
    pub confirm: Rc<ScriptedConfirm>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let clock = Rc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
                .single()
                .expect("valid start time"),
        ));
        let config = Config::default();
        let service = MemoryService::open(None, clock.clone(), config.auth.min_password_len);
        Self {
            pool: LocalPool::new(),
            service,
            clock,
            config,
        }
    }

    pub fn runtime(&self) -> (Runtime, Rc<ScriptedConfirm>) {
        let confirm = Rc::new(ScriptedConfirm::default());
        let runtime = Runtime {
            spawner: Rc::new(self.pool.spawner()),
            confirm: confirm.clone(),
            clock: self.clock.clone(),
        };
        (runtime, confirm)
    }

    pub fn client(&self, session: &str) -> Client {
        let (runtime, confirm) = self.runtime();
        let backend = Rc::new(self.service.session(session));
        let mut workspace = Workspace::new(&self.config, Some(backend), runtime);
        workspace.start();
        Client { workspace, confirm }
    }

    /// Runs spawned work and drains every client's events until quiet.
    pub fn settle(&mut self, clients: &mut [&mut Client]) {
        loop {
            self.pool.run_until_stalled();
            let handled: usize = clients.iter_mut().map(|c| c.workspace.pump()).sum();
            if handled == 0 {
                self.pool.run_until_stalled();
                if clients.iter_mut().map(|c| c.workspace.pump()).sum::<usize>() == 0 {
                    break;
                }
            }
        }
    }

    /// Registers and settles a fresh client signed in as `email`.
    pub fn signed_in(&mut self, session: &str, email: &str, name: &str) -> Client {
        let mut client = self.client(session);
        self.settle(&mut [&mut client]);
        client
            .workspace
            .register(email, PASSWORD, name)
            .expect("registration accepted");
        self.settle(&mut [&mut client]);
        assert!(client.workspace.user().is_some(), "{email} signed in");
        client
    }
}

pub fn notice(client: &Client, slot: NoticeSlot) -> Option<String> {
    client.workspace.notice(slot).map(|n| n.text.clone())
}

/// Selects year, zero-based month and day, failing the test on rejection.
pub fn pick_date(client: &mut Client, year: i32, month: usize, day: u32) {
    let ws = &mut client.workspace;
    ws.select_year(Some(year)).expect("year listed");
    ws.select_month(Some(month)).expect("month accepted");
    ws.select_day(Some(day)).expect("day accepted");
}

pub fn uid(client: &Client) -> String {
    client
        .workspace
        .user()
        .map(|u| u.uid.clone())
        .expect("signed in")
}

use std::{
    sync::mpsc::{Receiver, TryRecvError},
    thread,
    time::{Duration, Instant},
};

use shared_definitions::protocol::framer::MessageFramer;

use super::command_loop::CommandLoop;
use crate::{
    communication_interfaces::{console::OperatorAction, tcp::TcpCommandServer, CommandLink},
    telemetry::TelemetryMonitor,
    util::error::TransportError,
};

/// Fixed-period deadlines. A late tick pushes the next deadline past `now`
/// instead of queueing the missed ones.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    period: Duration,
    next_tick: Instant,
}

impl TickScheduler {
    pub fn new(period: Duration, start: Instant) -> Self {
        TickScheduler {
            period,
            next_tick: start + period,
        }
    }

    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_tick.saturating_duration_since(now)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_tick
    }

    /// Returns the number of deadlines skipped because the tick ran late.
    pub fn complete_tick(&mut self, now: Instant) -> u32 {
        let mut skipped = 0;
        self.next_tick += self.period;
        while self.next_tick <= now {
            self.next_tick += self.period;
            skipped += 1;
        }
        skipped
    }
}

/// The whole ground station on one thread: socket drain, operator actions
/// and the command tick, in that order, once per period.
pub struct GroundStation {
    server: TcpCommandServer,
    framer: MessageFramer,
    monitor: TelemetryMonitor,
    command_loop: CommandLoop,
    actions: Receiver<OperatorAction>,
    period: Duration,
    client_connected: bool,
}

impl GroundStation {
    pub fn new(
        server: TcpCommandServer,
        framer: MessageFramer,
        command_loop: CommandLoop,
        actions: Receiver<OperatorAction>,
        period: Duration,
    ) -> Self {
        GroundStation {
            server,
            framer,
            monitor: TelemetryMonitor::new(),
            command_loop,
            actions,
            period,
            client_connected: false,
        }
    }

    pub fn run(&mut self) {
        let mut scheduler = TickScheduler::new(self.period, Instant::now());
        log::info!("Control loop running every {:?}", self.period);
        loop {
            let now = Instant::now();
            if !scheduler.is_due(now) {
                thread::sleep(scheduler.time_until_next(now));
                continue;
            }
            if !self.step(now) {
                break;
            }
            let skipped = scheduler.complete_tick(Instant::now());
            if skipped > 0 {
                log::debug!("Control loop late, skipped {} ticks", skipped);
            }
        }
        log::info!("Control loop stopped");
    }

    /// Returns `false` when the operator quit.
    fn step(&mut self, now: Instant) -> bool {
        match self.server.accept_pending() {
            Ok(true) => {
                if self.client_connected {
                    self.command_loop.on_client_disconnected();
                }
                self.framer.reset();
                self.client_connected = true;
                self.command_loop.on_client_connected(&mut self.server);
            }
            Ok(false) => {}
            Err(error) => log::warn!("Accept failed: {}", error),
        }

        self.drain_socket(now);

        loop {
            match self.actions.try_recv() {
                Ok(action) => {
                    if !self.command_loop.apply(&mut self.server, action, now) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        self.command_loop.tick(&mut self.server, now);
        self.sync_connection();
        true
    }

    fn drain_socket(&mut self, now: Instant) {
        if !self.server.is_connected() {
            return;
        }
        let mut frames = Vec::new();
        let framer = &mut self.framer;
        let result = self.server.read_available(|bytes| {
            framer.feed(bytes, |frame| frames.push(frame));
        });

        for frame in frames {
            if let Some(record) = self.monitor.handle_frame(frame, now) {
                self.command_loop.on_telemetry(&mut self.server, record, now);
            }
        }
        match result {
            Ok(_) | Err(TransportError::Disconnected) => {}
            Err(error) => log::warn!("Read failed: {}", error),
        }
        if self.framer.is_desynchronized() {
            log::warn!("Lost frame sync, dropping the client");
            self.server.disconnect();
        }
        self.sync_connection();
    }

    fn sync_connection(&mut self) {
        if self.client_connected && !self.server.is_connected() {
            self.framer.reset();
            self.command_loop.on_client_disconnected();
        }
        self.client_connected = self.server.is_connected();
    }
}

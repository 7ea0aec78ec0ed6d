#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use marketbus::application::{Engine, WorkerSettings};
use marketbus::port::exchange::{ClientFactory, ExchangeDirectory};
use marketbus::testkit::exchange::{MockClientFactory, MockClients, MockDirectory, RequestLog};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// An engine over mock exchanges, running in the background.
pub struct Harness {
    pub engine: Arc<Engine>,
    pub directory: Arc<MockDirectory>,
    pub log: RequestLog,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Harness {
    /// Start an engine over the exchanges `build` adds to the directory.
    pub fn start(build: impl FnOnce(&RequestLog, MockDirectory) -> MockDirectory) -> Self {
        Self::start_with(build, |log| MockClients::new(log))
    }

    pub fn start_with(
        build: impl FnOnce(&RequestLog, MockDirectory) -> MockDirectory,
        clients: impl FnOnce(&RequestLog) -> MockClients,
    ) -> Self {
        let log = RequestLog::new();
        let directory = Arc::new(build(&log, MockDirectory::new()));
        let factory = Arc::new(MockClientFactory::new(clients(&log)));
        let engine = Arc::new(Engine::new(
            Arc::clone(&directory) as Arc<dyn ExchangeDirectory>,
            factory as Arc<dyn ClientFactory>,
            WorkerSettings::default(),
        ));

        let (shutdown, rx) = watch::channel(false);
        let runner = Arc::clone(&engine);
        let task = tokio::spawn(async move { runner.run(rx).await });

        Self {
            engine,
            directory,
            log,
            shutdown,
            task,
        }
    }

    /// Signal shutdown and wait for the engine to finish tearing down.
    pub async fn stop(self) -> (Arc<MockDirectory>, RequestLog) {
        self.shutdown.send_replace(true);
        self.task.await.expect("engine task");
        (self.directory, self.log)
    }
}

/// Poll `condition` until it holds. Panics after 30s of (virtual) time.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Let background tasks run for `duration` of (virtual) time.
pub async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}

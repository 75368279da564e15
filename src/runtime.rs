// Fixed-rate control loop with watchdog
// Each tick runs one full control cycle: read sensors, update odometry, drive modules.
// If commands stop arriving the watchdog stops the robot.

use std::time::Instant;
use tokio::time::interval;
use tracing::{info, warn};

// local imports
use crate::config::{DriveConfig, TOPIC_CMD_DRIVE, TOPIC_HEALTH, TOPIC_STATE_DRIVE};
use crate::drive::{Drivetrain, HeadingSensor, SimGyro, SimModule, SwerveModule};
use crate::messages::{DriveCommand, DriveTelemetry, RuntimeHealth};

pub struct Runtime<M: SwerveModule, G: HeadingSensor> {
    drivetrain: Drivetrain<M, G>,
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
    config: DriveConfig,
}

impl<M: SwerveModule, G: HeadingSensor> Runtime<M, G> {
    pub fn new(drivetrain: Drivetrain<M, G>, config: DriveConfig) -> Self {
        Self {
            drivetrain,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
            config,
        }
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: DriveCommand) {
        info!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Pick the command for this cycle based on watchdog state
    fn compute_command(&mut self) -> DriveCommand {
        let cmd_age = self.cmd_received_at.elapsed();

        if cmd_age > self.config.cmd_timeout() {
            // Watchdog triggered - stop the robot
            if self.health != RuntimeHealth::CmdStale {
                warn!("Command stale ({:?} old), stopping robot", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            DriveCommand::stop()
        } else if let Some(cmd) = self.latest_cmd {
            self.health = RuntimeHealth::Ok;
            cmd
        } else {
            // No command ever received
            self.health = RuntimeHealth::CmdStale;
            DriveCommand::stop()
        }
    }

    /// Run one control cycle of `dt` seconds
    ///
    /// Sensors are read and odometry updated before any new setpoint goes out.
    pub fn step(&mut self, dt: f64) -> DriveTelemetry {
        self.drivetrain.periodic();

        let cmd = self.compute_command();
        self.drivetrain.drive(&cmd);

        self.drivetrain.simulation_periodic(dt);
        self.drivetrain.telemetry()
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn drivetrain(&self) -> &Drivetrain<M, G> {
        &self.drivetrain
    }
}

pub async fn run(config: DriveConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let modules = std::array::from_fn(|_| SimModule::new());
    let drivetrain = Drivetrain::new(modules, SimGyro::new(), &config)?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let pub_telemetry = session.declare_publisher(TOPIC_STATE_DRIVE).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let period = config.period();
    let mut tick = interval(period);
    let mut runtime = Runtime::new(drivetrain, config);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        runtime.config.loop_hz, runtime.config.cmd_timeout_ms
    );
    info!("Subscribed to: {}", TOPIC_CMD_DRIVE);
    info!("Publishing to: {}, {}", TOPIC_STATE_DRIVE, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => {
                    runtime.on_command(cmd);
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Control cycle (includes watchdog logic)
        let telemetry = runtime.step(period.as_secs_f64());

        // 3. Publish telemetry
        let telemetry_json = serde_json::to_string(&telemetry)?;
        pub_telemetry.put(telemetry_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;
    }
}

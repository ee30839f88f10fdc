//! Convoy vehicle control node entry point.
//!
//! # Architecture
//!
//! A single thread runs the cyclic event loop:
//!
//!     - Bus input: speed and steering targets from the convoy master
//!     - Driver servicing: serial I/O, response timeouts and the motor watchdog feed
//!     - Sensor polling: ultrasonic gap and camera alignment
//!     - Telemetry: filtered gap and firmware version
//!
//! Every input is handed to the Adjuster, which sends its corrected commands to the hardware
//! through the `Actuator` trait. The only other thread is the camera tracker, which hands its
//! results to the loop through a single slot channel.
//!
//! Each piece of hardware is initialised on a try basis. If the microcontroller or the steering
//! servo cannot be brought up the node logs the failure and carries on without it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, error, info, warn};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::{
    bus::{BusClient, BusMessage},
    net::zmq,
    topics,
};
use cortex_lib::{
    adjust::{Actuator, Adjuster, Role},
    cam::{self, BusTracker, CamAlignment, SlotReceiver, TrackerThread},
    driver::{Pending, SerialDriver},
    gap::GapFilter,
    params::{CortexExecParams, TopicParams},
    steering::Steering,
};
use util::{
    host,
    logger::{level_from_verbosity, logger_init},
    maths::RangeMap,
    session::Session,
    timer::Timer,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "cortex_exec", about = "Convoy vehicle control node")]
struct Opt {
    /// Parameter file, relative to $CONVOY_SW_ROOT/params
    #[structopt(short, long, default_value = "cortex_exec.toml")]
    params: String,

    /// Verbose logging, -v for debug and -vv for trace
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Role override, leader or follower
    #[structopt(long)]
    role: Option<Role>,

    /// Use a fixed gap in millimeters instead of polling the gap sensor
    #[structopt(long)]
    gap: Option<i32>,
}

/// The hardware the Adjuster drives, either part may be missing.
struct Hardware {
    driver: Option<SerialDriver>,
    steering: Option<Steering>,
}

/// Network scale to internal unit maps of the command topics.
struct CommandMaps {
    topics: TopicParams,
    motor: RangeMap,
    steer: RangeMap,
}

/// Camera polling state.
struct CamPoller {
    timer: Timer,
    rx: SlotReceiver,
    alignment: CamAlignment,

    /// Kept alive for the lifetime of the poller
    _tracker: TrackerThread,
}

/// Gap polling state.
struct GapPoller {
    timer: Timer,
    filter: GapFilter,
    pin: u8,
    unit_mm: i32,
    pending: Option<Pending>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("cortex_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(level_from_verbosity(opt.verbose), &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Convoy Cortex Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let mut params: CortexExecParams =
        util::params::load(&opt.params).wrap_err("Could not load cortex_exec params")?;

    if let Some(role) = opt.role {
        params.role = role;
    }

    params.are_valid().wrap_err("Invalid cortex_exec params")?;

    info!(
        "Exec parameters loaded: {} is a {:?} at {:?}",
        params.name, params.role, params.position
    );

    // ---- INITIALISE HARDWARE ----

    info!("Initialising hardware...");

    let mut hw = Hardware {
        driver: match SerialDriver::open(&params.driver) {
            Ok(d) => Some(d),
            Err(e) => {
                error!("{}, continuing without motor control", e);
                None
            }
        },
        steering: match Steering::new(&params.steering) {
            Ok(s) => Some(s),
            Err(e) => {
                error!("Could not initialise the steering servo: {}, continuing without it", e);
                None
            }
        },
    };

    info!("Hardware initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let mut bus = BusClient::new(&zmq_ctx, &params.bus).wrap_err("Failed to initialise the BusClient")?;
    bus.subscribe(&params.topics.motor)
        .wrap_err("Failed to subscribe to the motor topic")?;
    bus.subscribe(&params.topics.steer)
        .wrap_err("Failed to subscribe to the steer topic")?;

    info!("Network initialisation complete");

    // ---- INITIALISE CONTROL ----

    let speed_limit = params.driver.speed_limit();
    let scale = params.driver.speed_scale;

    let maps = CommandMaps {
        motor: RangeMap::new(
            (params.topics.motor_scale.0, 0, params.topics.motor_scale.1),
            (scale.min_offset(), 0, scale.max_offset()),
        ),
        steer: RangeMap::new(
            (params.topics.steer_scale.0, 0, params.topics.steer_scale.1),
            (-90, 0, 90),
        ),
        topics: params.topics.clone(),
    };

    let mut adjuster = Adjuster::new(
        params.adjust.clone(),
        params.position,
        params.role,
        speed_limit,
        opt.gap.unwrap_or(0),
    );

    // Only followers correct for the gap and camera
    let mut gap_poller = match (params.role, opt.gap) {
        (Role::Follower, None) => Some(GapPoller::new(&params)),
        (Role::Follower, Some(gap)) => {
            info!("Using a fixed gap of {} mm", gap);
            None
        }
        (Role::Leader, _) => None,
    };

    let mut cam_poller = match (params.role, params.cam.enabled) {
        (Role::Follower, true) => CamPoller::try_new(&zmq_ctx, &params),
        _ => None,
    };

    let gap_topic = topics::telemetry(&params.name, "gap");
    let version_topic = topics::telemetry(&params.name, "version");
    let mut version_published = false;
    let mut bus_connected = false;

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- BUS INPUT ----

        if bus.connected() != bus_connected {
            bus_connected = !bus_connected;
            match bus_connected {
                true => info!("Connected to {}", params.bus.sub_endpoint),
                false => warn!("Connection to {} lost", params.bus.sub_endpoint),
            }
        }

        loop {
            match bus.try_recv() {
                Ok(Some(msg)) => maps.handle(&msg, &mut adjuster, &mut hw),
                Ok(None) => break,
                Err(e) => {
                    warn!("Could not receive from the bus: {}", e);
                    break;
                }
            }
        }

        // ---- DRIVER ----

        if let Some(driver) = hw.driver.as_mut() {
            driver.poll();

            if !driver.is_enabled() {
                error!("Microcontroller link lost, continuing without motor control");
                hw.driver = None;
            } else if let (false, Some(v)) = (version_published, driver.firmware_version()) {
                publish(&bus, &version_topic, v);
                version_published = true;
            }
        }

        // ---- SENSORS ----

        let now = Instant::now();

        if let Some(poller) = gap_poller.as_mut() {
            if let Some(gap) = poller.poll(now, &mut hw) {
                adjuster.gap_update(gap, &mut hw);
                publish(&bus, &gap_topic, gap);
            }
        }

        if let Some(poller) = cam_poller.as_mut() {
            if let Some(error) = poller.poll(now) {
                adjuster.cam_update(error, &mut hw);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match CYCLE_PERIOD.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!("Cycle overran by {:.06} s", (cycle_dur - CYCLE_PERIOD).as_secs_f64()),
        }
    }
}

/// Publish a telemetry value, failures are not fatal.
fn publish<T: ToString>(bus: &BusClient, topic: &str, value: T) {
    if let Err(e) = bus.publish(topic, &value.to_string()) {
        debug!("Could not publish {}: {}", topic, e);
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Actuator for Hardware {
    fn drive(&mut self, speed: i32) {
        if let Some(driver) = self.driver.as_mut() {
            driver.drive(speed);
        }
    }

    fn steering(&mut self, degree: i32) {
        if let Some(steering) = self.steering.as_mut() {
            if let Err(e) = steering.steer(degree) {
                warn!("Could not steer to {}: {}", degree, e);
            }
        }
    }
}

impl CommandMaps {
    /// Hand a command from the bus to the adjuster.
    fn handle(&self, msg: &BusMessage, adjuster: &mut Adjuster, hw: &mut Hardware) {
        let value = match msg.parse_int() {
            Ok(v) => v,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        if msg.topic == self.topics.motor {
            let speed = self.motor.forward(value);
            debug!("Motor command {} -> {}", value, speed);
            adjuster.speed_update(speed, hw);
        } else if msg.topic == self.topics.steer {
            let degree = self.steer.forward(value);
            debug!("Steer command {} -> {}", value, degree);
            adjuster.steer_update(degree, hw);
        }
    }
}

impl GapPoller {
    fn new(params: &CortexExecParams) -> Self {
        let mut timer = Timer::new(Duration::from_millis(params.gap.poll_interval_ms));
        timer.start(Instant::now());

        Self {
            timer,
            filter: GapFilter::new(params.gap.window),
            pin: params.gap.pin,
            unit_mm: params.gap.unit_mm,
            pending: None,
        }
    }

    /// Issue gap queries at the poll interval and collect their results.
    ///
    /// Returns a new median once the filter has one. A query is only issued once the previous one
    /// has completed.
    fn poll(&mut self, now: Instant, hw: &mut Hardware) -> Option<i32> {
        if self.timer.poll(now) && self.pending.is_none() {
            if let Some(driver) = hw.driver.as_mut() {
                self.pending = Some(driver.query_gap(self.pin));
            }
        }

        let result = self.pending.as_ref()?.poll()?;
        self.pending = None;

        match result {
            Ok(raw) => self.filter.push(raw as i32 * self.unit_mm),
            Err(e) => {
                debug!("Gap query failed: {}", e);
                None
            }
        }
    }
}

impl CamPoller {
    /// Start the tracker, or log why it could not be started.
    fn try_new(ctx: &zmq::Context, params: &CortexExecParams) -> Option<Self> {
        let tracker = match BusTracker::new(ctx, &params.bus, &params.cam.topic) {
            Ok(t) => t,
            Err(e) => {
                error!("Could not connect the camera tracker: {}, continuing without it", e);
                return None;
            }
        };

        let (tx, rx) = cam::slot();

        let tracker = match TrackerThread::spawn(tracker, tx) {
            Ok(t) => t,
            Err(e) => {
                error!("Could not start the camera tracker thread: {}, continuing without it", e);
                return None;
            }
        };

        let mut timer = Timer::new(Duration::from_millis(params.cam.poll_interval_ms));
        timer.start(Instant::now());

        Some(Self {
            timer,
            rx,
            alignment: CamAlignment::new(),
            _tracker: tracker,
        })
    }

    /// Sample the tracker at the poll interval, returning an alignment error to apply.
    fn poll(&mut self, now: Instant) -> Option<i32> {
        if !self.timer.poll(now) {
            return None;
        }

        let position = self.rx.try_recv()?;
        self.alignment.update(position).error()
    }
}

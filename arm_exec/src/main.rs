//! # Robot Arm Executable
//!
//! This executable drives the robot arm from an interactive prompt:
//! - Initialise the session, logging and parameters
//! - Initialise the PWM driver, which is fatal on failure
//! - Reset the arm and run the prompt until the operator quits
//! - Reset and rest the arm before exiting

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Result};
use log::{error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use arm_lib::{
    arm_ctrl::Arm,
    cmd::{ArmCmd, CmdParseError, Outcome},
    params::{DriverKind, DriverParams, ExecParams},
    pwm::{self, SharedDriver, SimDriver},
    timer::ThreadTimer,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PROMPT: &str = "Command? ";

const HISTORY_FILE: &str = "history.txt";

/// Time given to the servos to reach their reset position before resting them on exit.
const SHUTDOWN_SETTLE_TIME: Duration = Duration::from_millis(750);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "arm_exec", about = "Interactive robot arm controller")]
struct Opts {
    /// Minimum level of log messages to show (trace, debug, info, warn, error)
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,

    /// Parameter file, relative to the params directory
    #[structopt(long, default_value = "arm_exec.toml")]
    params: String,

    /// Use the simulated PWM driver regardless of the parameters
    #[structopt(long)]
    sim: bool,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "arm_exec", 
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Robot Arm Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let params: ExecParams = util::params::load(&opts.params)
        .wrap_err("Could not load the arm parameters")?;

    info!("Parameters loaded");

    // ---- HARDWARE INITIALISATION ----

    let driver = create_driver(&params.driver, opts.sim)?;

    pwm::lock(&driver)
        .set_frequency(params.driver.frequency_hz)
        .wrap_err("Failed to initialise the PWM driver")?;

    info!("PWM driver initialised at {} Hz", params.driver.frequency_hz);

    let timer = Arc::new(ThreadTimer::new().wrap_err("Failed to start the timer thread")?);

    let arm = Arm::new(&params.arm, &params.servo, driver, timer)
        .wrap_err("Failed to assemble the arm")?;

    arm.reset_servos().wrap_err("Failed to reset the arm")?;
    arm.open_claw(None).wrap_err("Failed to open the claw")?;
    arm.close_claw().wrap_err("Failed to close the claw")?;

    info!("Initialisation complete, entering prompt");

    // ---- MAIN LOOP ----

    run_prompt(&arm, &session)?;

    // ---- SHUTDOWN ----

    if let Err(e) = arm.reset_servos() {
        warn!("Could not reset the arm before exiting: {}", e);
    }
    thread::sleep(SHUTDOWN_SETTLE_TIME);
    if let Err(e) = arm.rest_servos() {
        warn!("Could not rest the arm before exiting: {}", e);
    }

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read and execute commands until the operator quits.
///
/// Rejected commands are logged and never end the loop.
fn run_prompt(arm: &Arm, session: &Session) -> Result<()> {
    let history_path = session.file_path(HISTORY_FILE);

    let mut rl = DefaultEditor::new().wrap_err("Failed to create the prompt")?;
    if rl.load_history(&history_path).is_err() {
        info!("No history detected");
    }

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                info!("Goodbye!");
                break
            }
            Err(e) => {
                error!("Could not read from the prompt: {}", e);
                break
            }
        };

        if let Err(e) = rl.add_history_entry(line.as_str()) {
            warn!("Could not add the command to the history: {}", e);
        }

        let cmd = match ArmCmd::parse(&line) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(CmdParseError::Help(help)) => {
                println!("{}", help);
                continue
            }
            Err(e) => {
                error!("{}", e);
                continue
            }
        };

        match cmd.execute(arm) {
            Ok(Outcome::Continue) => (),
            Ok(Outcome::Quit) => break,
            // Already logged where it was raised
            Err(e) => info!("Command rejected: {}", e),
        }
    }

    if let Err(e) = rl.save_history(&history_path) {
        warn!("Could not save the prompt history: {}", e);
    }

    Ok(())
}

/// Create the PWM driver selected by the parameters.
fn create_driver(params: &DriverParams, force_sim: bool) -> Result<SharedDriver> {
    if force_sim || params.kind == DriverKind::Sim {
        info!("Using the simulated PWM driver");
        return Ok(pwm::share(SimDriver::new()));
    }

    create_pca9685(params)
}

#[cfg(all(target_arch = "arm", target_os = "linux"))]
fn create_pca9685(params: &DriverParams) -> Result<SharedDriver> {
    use arm_lib::pwm::pca9685::Pca9685Driver;

    let i2c = rppal::i2c::I2c::new().wrap_err("Failed to open the I2C bus")?;
    let driver = Pca9685Driver::new(i2c, params.i2c_address)
        .wrap_err("Failed to connect to the PCA9685")?;

    Ok(pwm::share(driver))
}

#[cfg(not(all(target_arch = "arm", target_os = "linux")))]
fn create_pca9685(_params: &DriverParams) -> Result<SharedDriver> {
    Err(color_eyre::eyre::eyre!(
        "The PCA9685 driver needs the Raspberry Pi's I2C bus, run with --sim on this platform"
    ))
}

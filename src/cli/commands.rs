use crate::cli::args::{
    AdcCommand, Args, Command, ConfigCommand, ZStageCommand,
};
use crate::cli::output::{ConsoleWriter, DeviceInfo};
use crate::core::adc;
use crate::core::discovery::DiscoveredDevice;
use crate::core::protocol::{self, Command as DeviceCommand};
use crate::core::session::{DeviceSession, Monitor, SessionOptions, Transport};
use crate::core::zstage::{ZStage, ZStageUpdate};
use crate::domain::config::{GlobalConfig, PeriboardConfig};
use crate::domain::error::{PeriboardError, PeriboardResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::sim::SimDevice;
use std::path::Path;
use std::time::Duration;

/// Execute CLI command
pub async fn execute_command(args: Args) -> PeriboardResult<()> {
    let writer = ConsoleWriter::new(args.output.clone());

    let config_manager = ConfigManager::new()?;
    let config = match &args.config {
        Some(path) => config_manager.load_config_from_path(Path::new(path))?,
        None => config_manager.load_config()?,
    };

    if !args.quiet {
        setup_logging(&config.global, args.verbose)?;
    }

    match &args.command {
        Command::Discover {
            timeout_ms,
            settling_ms,
        } => {
            let devices = if args.sim {
                probe_sim_device().await.map(|device| vec![device])?
            } else {
                crate::infrastructure::serial::available_devices(
                    config.device.baud_rate,
                    Duration::from_millis(*timeout_ms),
                    Duration::from_millis(*settling_ms),
                )
                .await?
            };
            writer.write_devices(&devices)?;
            Ok(())
        }
        Command::Info => {
            let session = open_session(&args, &config).await?;
            let info = read_device_info(&session).await?;
            writer.write_info(&info)?;
            Ok(())
        }
        Command::Zstage(zstage_args) => {
            let session = open_session(&args, &config).await?;
            let zstage = ZStage::new(&session, config.device.zstage.clone());

            match &zstage_args.command {
                ZStageCommand::Position => {
                    let position = zstage.position().await?;
                    writer.write_message(&position.to_string())?;
                }
                ZStageCommand::MoveTo { position } => {
                    zstage.move_to(*position).await?;
                    writer.write_message(&format!("move to {} started", position))?;
                }
                ZStageCommand::Home => {
                    zstage.home().await?;
                    writer.write_message("homing started")?;
                }
                ZStageCommand::Up => {
                    zstage.up().await?;
                    writer.write_message("z-stage up")?;
                }
                ZStageCommand::Down => {
                    zstage.down().await?;
                    writer.write_message("z-stage lowering")?;
                }
                ZStageCommand::State => {
                    let state = zstage.state().await?;
                    writer.write_zstage_state(&state)?;
                }
                ZStageCommand::Set {
                    motor_enabled,
                    micro_stepping,
                    home_stop,
                    engaged_stop,
                    rpm,
                } => {
                    let update = ZStageUpdate {
                        motor_enabled: *motor_enabled,
                        micro_stepping: *micro_stepping,
                        home_stop_enabled: *home_stop,
                        engaged_stop_enabled: *engaged_stop,
                        rpm: *rpm,
                    };
                    if update.is_empty() {
                        return Err(PeriboardError::Config {
                            message: "no settings given; pass at least one --flag".to_string(),
                        });
                    }
                    zstage.apply(&update).await?;
                    writer.write_message("settings applied")?;
                }
            }
            Ok(())
        }
        Command::Adc(adc_args) => match adc_args.command {
            AdcCommand::Calibration => {
                let session = open_session(&args, &config).await?;
                let calibration = adc::read_calibration(&session).await?;
                writer.write_calibration(&calibration)?;
                Ok(())
            }
        },
        Command::Config(config_args) => match &config_args.command {
            ConfigCommand::Show => {
                writer.write_config(&config)?;
                Ok(())
            }
            ConfigCommand::Init { output } => {
                let default_config = PeriboardConfig::default();
                let path = match output {
                    Some(path) => Path::new(path).to_path_buf(),
                    None => config_manager.global_config_path().to_path_buf(),
                };
                config_manager.save_config_to_path(&path, &default_config)?;
                writer.write_message(&format!("wrote {}", path.display()))?;
                Ok(())
            }
            ConfigCommand::Validate { file } => {
                match file {
                    Some(path) => {
                        config_manager.load_config_from_path(Path::new(path))?;
                    }
                    None => {
                        config_manager.load_config()?;
                    }
                }
                writer.write_message("configuration is valid")?;
                Ok(())
            }
        },
        Command::Version => {
            writer.write_message(&format!("periboard {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

/// Connect to the board named by `--port`, discovery, or `--sim`.
async fn open_session(args: &Args, config: &PeriboardConfig) -> PeriboardResult<DeviceSession> {
    let options = SessionOptions::from(config);

    if args.sim {
        let mut session = DeviceSession::with_opener(
            "sim0",
            options,
            Box::new(|_: &str, _: u32| Ok(Box::new(SimDevice::new()) as Box<dyn Transport>)),
        );
        session.connect().await?;
        return Ok(session);
    }

    DeviceSession::establish(args.port.clone(), options).await
}

async fn read_device_info(session: &DeviceSession) -> PeriboardResult<DeviceInfo> {
    let _guard = session.transaction().await;

    let device_name = session.execute(&DeviceCommand::DeviceName, None).await?;
    let device_version = session.execute(&DeviceCommand::DeviceVersion, None).await?;
    let id = session.execute(&DeviceCommand::Id, None).await?;
    let ram_free = session.execute(&DeviceCommand::RamFree, None).await?;

    Ok(DeviceInfo {
        device_name: protocol::parse_text(&device_name)?,
        device_version: protocol::parse_text(&device_version)?,
        id: protocol::parse_text(&id)?,
        ram_free: protocol::parse_u32(&ram_free)?,
    })
}

/// Identity-probe an in-process simulated board, mirroring the real
/// discovery path minus the serial enumeration.
async fn probe_sim_device() -> PeriboardResult<DiscoveredDevice> {
    let monitor = Monitor::start(Box::new(SimDevice::new()));
    monitor.connected().await?;

    let timeout = Duration::from_secs(1);
    let name = monitor
        .request(DeviceCommand::DeviceName.encode(), timeout)
        .await?;
    let version = monitor
        .request(DeviceCommand::DeviceVersion.encode(), timeout)
        .await?;
    monitor.stop();

    Ok(DiscoveredDevice {
        port: "sim0".to_string(),
        device_name: protocol::parse_text(&name)?,
        device_version: protocol::parse_text(&version)?,
    })
}

fn setup_logging(global: &GlobalConfig, verbose: bool) -> PeriboardResult<()> {
    let level = if verbose { "debug" } else { &global.log_level };
    crate::infrastructure::logging::init_logging(level)
}

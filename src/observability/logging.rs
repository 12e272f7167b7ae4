use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter};

/// Route `log` records to stderr with coloured levels.
///
/// stdout is left to command output (database info, progress lines). HTTP
/// client internals are capped at `warn` unless tracing is requested.
pub fn init_logging(level: Level) -> anyhow::Result<()> {
	dispatch(level)
		.apply()
		.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

	Ok(())
}

fn dispatch(level: Level) -> fern::Dispatch {
	let colors = ColoredLevelConfig::new()
		.error(Color::Red)
		.warn(Color::Yellow)
		.info(Color::Green)
		.debug(Color::Blue)
		.trace(Color::Magenta);

	let deps = if level == Level::Trace {
		LevelFilter::Trace
	} else {
		LevelFilter::Warn
	};

	fern::Dispatch::new()
		.format(move |out, message, record| {
			out.finish(format_args!(
				"{:<5} {}: {}",
				colors.color(record.level()),
				record.target(),
				message
			))
		})
		.level(level.to_level_filter())
		.level_for("reqwest", deps)
		.level_for("hyper", deps)
		.level_for("hyper_util", deps)
		.level_for("rustls", deps)
		.chain(std::io::stderr())
}

#[cfg(test)]
#[cfg(feature = "unit-tests")]
mod tests {
	use log::Level;

	#[test]
	fn logging_initialization() {
		// The global logger can only be installed once per process.
		let _ = super::init_logging(Level::Debug);
		assert!(super::init_logging(Level::Info).is_err());
	}
}

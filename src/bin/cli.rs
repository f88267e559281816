use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use shmlink::{
    channels::QueueChannels,
    context::{Context, ContextConfig},
    error::ShmLinkError,
    layout::GlobalMemoryRegion,
    memory::{BackingType, RegionView, SharedMemoryRegion},
    messages::{RegisterMemoryRegionRequest, REGISTER_MEMORY_REGION_REQUEST_TYPE_ID},
    Result,
};

fn main() -> Result<()> {
    env_logger::init();

    let name_arg = || {
        Arg::with_name("name")
            .short("n")
            .long("name")
            .value_name("NAME")
            .help("Name of the region")
            .required(true)
            .takes_value(true)
    };
    let size_arg = || {
        Arg::with_name("size")
            .short("s")
            .long("size")
            .value_name("SIZE")
            .help("Size in bytes, including the region header")
            .required(true)
            .takes_value(true)
    };

    let matches = App::new("shmlink-cli")
        .version(env!("CARGO_PKG_VERSION"))
        .about("shmlink shared memory region tool")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("dir")
                .short("d")
                .long("dir")
                .value_name("DIR")
                .help("Directory holding file-backed regions")
                .global(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("backing")
                .short("b")
                .long("backing")
                .value_name("BACKING")
                .help("Backing type: file-backed or posix-shm")
                .global(true)
                .takes_value(true),
        )
        .subcommand(
            SubCommand::with_name("region")
                .about("Manage named regions")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("create")
                        .about("Create or open a region and register it")
                        .arg(name_arg())
                        .arg(size_arg()),
                )
                .subcommand(
                    SubCommand::with_name("inspect")
                        .about("Show the header of an existing region")
                        .arg(name_arg())
                        .arg(size_arg()),
                )
                .subcommand(
                    SubCommand::with_name("unlink")
                        .about("Remove a region from its namespace")
                        .arg(name_arg()),
                ),
        )
        .subcommand(
            SubCommand::with_name("global")
                .about("Global memory region")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(SubCommand::with_name("show").about("Show the region counter")),
        )
        .subcommand(SubCommand::with_name("info").about("Show version information"))
        .get_matches();

    let config = context_config(&matches)?;

    match matches.subcommand() {
        ("region", Some(region_matches)) => handle_region_commands(config, region_matches),
        ("global", Some(global_matches)) => handle_global_commands(config, global_matches),
        ("info", Some(_)) => show_info(),
        _ => {
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

/// Environment configuration overridden by the global flags
fn context_config(matches: &ArgMatches) -> Result<ContextConfig> {
    let mut config = ContextConfig::from_env()?;

    if let Some(dir) = matches.value_of("dir") {
        config = config.with_directory(dir);
    }

    if let Some(backing) = matches.value_of("backing") {
        let backing_type = BackingType::from_name(backing).ok_or_else(|| {
            ShmLinkError::invalid_argument("backing", format!("Unknown backing type {}", backing))
        })?;
        config = config.with_backing_type(backing_type);
    }

    config.validate()?;
    Ok(config)
}

fn parse_size(matches: &ArgMatches) -> Result<usize> {
    matches
        .value_of("size")
        .unwrap_or_default()
        .parse()
        .map_err(|_| ShmLinkError::invalid_argument("size", "Invalid size format"))
}

fn region_name<'a>(matches: &'a ArgMatches) -> &'a str {
    matches.value_of("name").unwrap_or_default()
}

fn handle_region_commands(config: ContextConfig, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("create", Some(create_matches)) => {
            let name = region_name(create_matches);
            let size = parse_size(create_matches)?;

            let channels = QueueChannels::default();
            let context = Context::open(config, channels.channel_set())?;
            let region = context.create_memory_region::<()>(name, size)?;

            println!(
                "{} region '{}' ({} bytes, id {})",
                if region.created() { "Created" } else { "Opened" },
                region.name(),
                region.size(),
                region.region_id()
            );

            println!("\nControl channel:");
            while let Some(frame) = channels.control.try_recv_message()? {
                if frame.type_id() == REGISTER_MEMORY_REGION_REQUEST_TYPE_ID {
                    let request: RegisterMemoryRegionRequest = frame.decode()?;
                    println!(
                        "  RegisterMemoryRegionRequest {{ name: {}, size: {}, id: {} }} ({} bytes)",
                        request.name,
                        request.region_size,
                        request.region_id,
                        frame.len()
                    );
                } else {
                    println!("  type {:#010x} ({} bytes)", frame.type_id(), frame.len());
                }
            }
        }
        ("inspect", Some(inspect_matches)) => {
            let name = region_name(inspect_matches);
            let size = parse_size(inspect_matches)?;

            let (created, region) = RegionView::<()>::create_or_open(config.region_config(name, size))?;
            if created {
                region.unlink()?;
                println!("Region '{}' does not exist", name);
                return Ok(());
            }

            let info = region.region().info();
            println!("Region '{}':", info.name);
            println!("  Size: {} bytes", info.size);
            println!("  Backing: {}", info.backing_type.name());
            println!("  Region id: {}", info.region_id);
            println!("  Creator pid: {}", info.creator_pid);
        }
        ("unlink", Some(unlink_matches)) => {
            let name = region_name(unlink_matches);
            // Unlinking only needs the name and backing; the size is ignored
            SharedMemoryRegion::unlink(&config.region_config(name, 0))?;
            println!("Unlinked region '{}'", name);
        }
        _ => println!("Use 'region --help' for usage information"),
    }
    Ok(())
}

fn handle_global_commands(config: ContextConfig, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        ("show", Some(_)) => {
            let (created, global) =
                RegionView::<GlobalMemoryRegion>::create_or_open(config.global_region_config())?;

            println!("Global region '{}':", global.name());
            println!("  Size: {} bytes", global.size());
            println!("  Created by this call: {}", created);
            println!(
                "  Total memory region count: {}",
                global.payload().total_memory_region_count()
            );
        }
        _ => println!("Use 'global --help' for usage information"),
    }
    Ok(())
}

fn show_info() -> Result<()> {
    println!("shmlink shared memory region tool");
    println!("Version: {}", shmlink::VERSION);

    println!("\nCapabilities:");
    println!("  - Named shared memory regions (file-backed, POSIX shm)");
    println!("  - Global region id allocation");
    println!("  - Flat relocatable message encoding");
    println!("  - Shared component configuration");

    Ok(())
}

use anyhow::{anyhow, Context};
use meshcore::*;
use meshcore::ccl::{
    lines,
    plan_line,
    BidirectionalMode,
    ClusterAxis,
    CollectiveConfig,
    Topology,
};
use tracing_subscriber::{fmt as tracing_fmt, EnvFilter};

/// Inspects a device mesh and the collectives it can run
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a `row,col,chip_id[,arch]` CSV
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    input:      PathBuf,

    /// Architecture of devices whose record doesn't name one
    #[arg(short, long, value_enum, default_value_t = Arch::WormholeB0)]
    arch:       Arch,

    /// Mesh shape as ROWSxCOLS (default: tight fit around the devices)
    #[arg(long, value_parser = parse_shape)]
    shape:      Option<DeviceGrid>,

    /// Top-left corner of a window to look through, as ROW,COL
    #[arg(long, value_parser = parse_coord, requires = "bottom_right")]
    top_left:   Option<Coordinate>,

    /// Bottom-right corner of the window, as ROW,COL
    #[arg(long, value_parser = parse_coord, requires = "top_left")]
    bottom_right: Option<Coordinate>,

    /// Keep only these chips (repeatable)
    #[arg(long)]
    only:       Vec<ChipId>,

    /// Lines the collective runs along
    #[arg(long, value_enum, default_value_t = ClusterAxis::Rows)]
    axis:       ClusterAxis,

    /// Collective topology
    #[arg(short, long, value_enum, default_value_t = Topology::Ring)]
    topology:   Topology,

    /// How a ring splits work between directions
    #[arg(short, long, value_enum, default_value_t = BidirectionalMode::SplitTensor)]
    mode:       BidirectionalMode,

    /// Ethernet links between neighbours
    #[arg(short = 'l', long, default_value_t = 1)]
    num_links:  u32,

    /// Data-mover buffers per link
    #[arg(short, long, default_value_t = 4)]
    buffers:    u32,
}

fn parse_pair(s: &str, sep: char) -> Result<(usize, usize), String> {
    let (a, b) = s.split_once(sep)
        .ok_or(format!("expected two numbers separated by `{sep}`"))?;
    let a = a.trim().parse::<usize>().map_err(|e| e.to_string())?;
    let b = b.trim().parse::<usize>().map_err(|e| e.to_string())?;

    Ok((a, b))
}

fn parse_shape(s: &str) -> Result<DeviceGrid, String> {
    parse_pair(s, 'x')
}

fn parse_coord(s: &str) -> Result<Coordinate, String> {
    parse_pair(s, ',').map(Coordinate::from)
}

fn print_lines(title: &str, lines: &[Vec<&Chip>]) {
    println!("{title}:");
    for (idx, l) in lines.iter().enumerate() {
        println!("\t{idx}:\t[{}]", l.iter().map(|d| d.id).join(", "));
    }
}

fn main() -> anyhow::Result<()> {
    tracing_fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Args::parse();
    let mesh = read_mesh::<MeshCSVParser, &str>(cli.input.clone(), cli.arch, cli.shape)
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Reading mesh from {}", cli.input.display()))?;
    println!(
        "Mesh:\t\t{}x{}, {} devices",
        mesh.num_rows(),
        mesh.num_cols(),
        mesh.num_devices()
    );

    let view = match (cli.top_left, cli.bottom_right) {
        (Some(tl), Some(br))    => DeviceMeshView::from_window(&mesh, tl, br)?,
        _                       => DeviceMeshView::new(&mesh)?,
    };
    let view = if cli.only.is_empty() {
        view
    } else {
        for id in cli.only.iter().filter(|id| !view.device_coordinates().contains_key(*id)) {
            warn!(id, "Chip not in view, ignored");
        }
        view.subview(|d| cli.only.contains(&d.id))
    };
    println!(
        "View:\t\t{} to {}, {} devices",
        view.top_left(),
        view.bottom_right(),
        view.size()
    );
    print_lines("Rows", &view.get_row_views());
    print_lines("Columns", &view.get_column_views());

    let config = CollectiveConfig {
        num_links:          cli.num_links,
        buffers_per_link:   cli.buffers,
        mode:               cli.mode,
        ..Default::default()
    };
    for (line_idx, line) in lines(&view, cli.axis).iter().enumerate() {
        println!("\n{:?} line {line_idx} ({:?}):", cli.axis, cli.topology);
        for plan in plan_line(line, cli.topology, &config)? {
            let coord = view.find_device(plan.chip);
            let ring = &plan.ring;
            println!(
                "\tchip {} at {coord}: index {}/{}, from {:?}, to {:?}, transfers {}/{}",
                plan.chip,
                ring.ring_index,
                ring.ring_size,
                ring.sender,
                ring.receiver,
                ring.sender_num_transfers(0, cli.mode),
                ring.receiver_num_transfers(0, cli.mode),
            );
            for l in &plan.links {
                let [rx, wr, rd] = l.addresses(plan.semaphores.mem_map());
                println!(
                    "\t\tlink {} dir {}: receiver 0x{rx:x}, sender writer 0x{wr:x}, sender reader 0x{rd:x}",
                    l.link,
                    l.direction,
                );
            }
        }
    }

    Ok(())
}

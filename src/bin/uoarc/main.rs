//! uoarc CLI - inspect a client data directory.

use std::process::ExitCode;

use uoarc::manager::{AssetManager, LoadOptions};
use uoarc::util::ClientVersion;

const BUILD_DATE: &str = env!("UOARC_BUILD_DATE");
const BUILD_TIME: &str = env!("UOARC_BUILD_TIME");

fn usage() {
    eprintln!("uoarc - Ultima Online client archive inspector (built {BUILD_DATE} {BUILD_TIME})");
    eprintln!();
    eprintln!("Usage: uoarc <data-dir> <client-version> [command]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  info              summary of loaded categories (default)");
    eprintln!("  body <graphic>    animation classification for a body id");
    eprintln!("  gump <id>         dimensions of a gump sprite");
    eprintln!();
    eprintln!("Example: uoarc ~/uo 7.0.59.8 body 400");
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uoarc=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        usage();
        return ExitCode::FAILURE;
    }

    let version: ClientVersion = match args[1].parse() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("bad client version: {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = LoadOptions::new(version, &args[0]);
    let assets = match AssetManager::load(options) {
        Ok(assets) => assets,
        Err(e) => {
            eprintln!("load failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.get(2).map(String::as_str).unwrap_or("info") {
        "info" => print_info(&assets),
        "body" => {
            let Some(graphic) = args.get(3).and_then(|a| parse_id(a)) else {
                usage();
                return ExitCode::FAILURE;
            };
            print_body(&assets, graphic as u16);
        }
        "gump" => {
            let Some(id) = args.get(3).and_then(|a| parse_id(a)) else {
                usage();
                return ExitCode::FAILURE;
            };
            print_gump(&assets, id);
        }
        other => {
            eprintln!("unknown command: {other}");
            usage();
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn parse_id(arg: &str) -> Option<usize> {
    if let Some(hex) = arg.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        arg.parse().ok()
    }
}

fn print_info(assets: &AssetManager) {
    println!("client version : {}", assets.version);
    println!("uop install    : {}", assets.is_uop_installation);

    let category = |name: &str, loaded: bool, detail: String| {
        let status = if loaded { detail } else { "missing".into() };
        println!("{name:<15}: {status}");
    };

    category(
        "animations",
        assets.animations.is_some(),
        assets
            .animations
            .as_ref()
            .map(|a| format!("{} bodies", a.body_count()))
            .unwrap_or_default(),
    );
    category(
        "art",
        assets.art.is_some(),
        assets
            .art
            .as_ref()
            .map(|a| format!("{} entries", a.table().entry_count()))
            .unwrap_or_default(),
    );
    category(
        "gumps",
        assets.gumps.is_some(),
        assets
            .gumps
            .as_ref()
            .map(|g| format!("{} entries", g.table().entry_count()))
            .unwrap_or_default(),
    );
    category(
        "hues",
        assets.hues.is_some(),
        assets
            .hues
            .as_ref()
            .map(|h| format!("{} hues", h.hue_count()))
            .unwrap_or_default(),
    );
    category(
        "tiledata",
        assets.tiledata.is_some(),
        assets
            .tiledata
            .as_ref()
            .map(|t| format!("{} land / {} static", t.land().len(), t.statics().len()))
            .unwrap_or_default(),
    );
    category(
        "maps",
        assets.maps.is_some(),
        assets
            .maps
            .as_ref()
            .map(|m| {
                let facets = (0..uoarc::map::MAP_COUNT)
                    .filter(|&i| m.has_facet(i))
                    .count();
                format!("{facets} facets")
            })
            .unwrap_or_default(),
    );
    category(
        "multis",
        assets.multis.is_some(),
        assets
            .multis
            .as_ref()
            .map(|m| format!("{} entries", m.count()))
            .unwrap_or_default(),
    );
    category(
        "skills",
        assets.skills.is_some(),
        assets
            .skills
            .as_ref()
            .map(|s| format!("{} skills", s.count()))
            .unwrap_or_default(),
    );
    category(
        "fonts",
        assets.fonts.is_some(),
        assets
            .fonts
            .as_ref()
            .map(|f| format!("{} fonts", f.count()))
            .unwrap_or_default(),
    );
    category(
        "verdata",
        assets.verdata.is_some(),
        assets
            .verdata
            .as_ref()
            .map(|v| format!("{} patch records", v.patches().len()))
            .unwrap_or_default(),
    );
}

fn print_body(assets: &AssetManager, graphic: u16) {
    let Some(anims) = &assets.animations else {
        eprintln!("animations not loaded");
        return;
    };

    println!("body {graphic} (0x{graphic:04X})");
    println!("  type      : {:?}", anims.anim_type(graphic));
    println!("  flags     : 0x{:08X}", anims.anim_flags(graphic).0);
    println!("  layout    : {:?}", anims.layout_group(graphic));

    if let Some(body) = anims.body(graphic) {
        println!("  file      : anim{}", body.file_index);
        println!("  valid mul : {}", body.is_valid_mul);
        println!("  uop       : {}", body.is_uop());

        let stand = anims.frames(graphic, 0, 0, 0, false, false, false);
        println!(
            "  action 0  : {} frame(s), dir 0{}",
            stand.frames.len(),
            if stand.use_uop { " (uop)" } else { "" }
        );
    }
}

fn print_gump(assets: &AssetManager, id: usize) {
    let Some(gumps) = &assets.gumps else {
        eprintln!("gumps not loaded");
        return;
    };

    match gumps.dimensions(id) {
        Some((w, h)) => {
            let frame = gumps.gump(id);
            println!(
                "gump {id}: {w}x{h}, decoded {} pixel(s)",
                frame.pixels.len()
            );
        }
        None => println!("gump {id}: absent"),
    }
}

//! Load orchestration.
//!
//! Startup loads every resource category as its own parallel task and
//! waits for all of them behind a fixed deadline; base data that never
//! arrives is fatal, a client cannot limp on without it. After the join the
//! patch stack runs in its fixed order: `art.def` aliases first, then the
//! verdata blob (mandatory for old clients, opt-in afterwards). Map-diff
//! patches stay runtime-toggleable on the loaded [`MapLoader`].

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::anim::{AnimationLoader, BodyConvFlags};
use crate::art::ArtLoader;
use crate::def::DefReader;
use crate::fonts::FontsLoader;
use crate::gumps::GumpLoader;
use crate::hues::HuesTable;
use crate::map::MapLoader;
use crate::multimap::MultiMapLoader;
use crate::multis::MultiLoader;
use crate::resolve::FileResolver;
use crate::skills::SkillsLoader;
use crate::sounds::SoundLoader;
use crate::tiledata::TileData;
use crate::util::{ClientVersion, Error, Result};
use crate::verdata::{PatchTargets, Verdata};

/// Default deadline for the parallel category load.
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup configuration.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Client era of the data directory.
    pub version: ClientVersion,
    /// The data directory.
    pub base_path: PathBuf,
    /// Optional `key=path` override map file.
    pub override_map: Option<PathBuf>,
    /// Request verdata patching (forced anyway below 5.0.0a).
    pub use_verdata: bool,
    /// Which secondary animation files `bodyconv.def` may use.
    pub body_conv: BodyConvFlags,
    /// Facet dimensions override for shards with custom maps.
    pub map_layouts: Option<[(u32, u32); crate::map::MAP_COUNT]>,
    /// Parallel-load deadline.
    pub timeout: Duration,
}

impl LoadOptions {
    pub fn new(version: ClientVersion, base_path: impl Into<PathBuf>) -> Self {
        Self {
            version,
            base_path: base_path.into(),
            override_map: None,
            use_verdata: false,
            body_conv: BodyConvFlags::all(),
            map_layouts: None,
            timeout: LOAD_TIMEOUT,
        }
    }
}

/// Every loaded category. Optional categories whose files are missing stay
/// `None`; querying them yields absent results at the call site.
pub struct AssetManager {
    pub version: ClientVersion,
    /// True when the directory ships UOP archives (7.0+ with MainMisc.uop).
    pub is_uop_installation: bool,
    resolver: Arc<FileResolver>,
    pub animations: Option<AnimationLoader>,
    pub art: Option<ArtLoader>,
    pub gumps: Option<GumpLoader>,
    pub hues: Option<HuesTable>,
    pub tiledata: Option<TileData>,
    pub maps: Option<MapLoader>,
    pub multis: Option<MultiLoader>,
    pub skills: Option<SkillsLoader>,
    pub sounds: Option<SoundLoader>,
    pub fonts: Option<FontsLoader>,
    pub multimaps: Option<MultiMapLoader>,
    pub verdata: Option<Verdata>,
}

/// One finished category task.
enum Loaded {
    Animations(Result<AnimationLoader>),
    Art(Result<ArtLoader>),
    Gumps(Result<GumpLoader>),
    Hues(Result<HuesTable>),
    TileData(Result<TileData>),
    Maps(Result<MapLoader>),
    Multis(Result<MultiLoader>),
    Skills(Result<SkillsLoader>),
    Sounds(Result<SoundLoader>),
    Fonts(Result<FontsLoader>),
    MultiMaps(Result<MultiMapLoader>),
}

impl AssetManager {
    /// Load a data directory.
    pub fn load(options: LoadOptions) -> Result<Self> {
        let started = Instant::now();

        let resolver = Arc::new(match &options.override_map {
            Some(map) => FileResolver::with_override_map(options.base_path.clone(), map)?,
            None => FileResolver::new(options.base_path.clone()),
        });

        let version = options.version;
        let is_uop_installation = version >= ClientVersion::V_7000
            && resolver.resolve_existing("MainMisc.uop").is_some();

        info!(%version, uop = is_uop_installation, "loading client files");

        let (tx, rx) = mpsc::channel::<Loaded>();
        let mut expected = 0usize;

        macro_rules! spawn_task {
            ($wrap:expr, $load:expr) => {{
                let tx = tx.clone();
                let resolver = Arc::clone(&resolver);
                expected += 1;
                rayon::spawn(move || {
                    let _ = tx.send($wrap($load(&resolver)));
                });
            }};
        }

        let uop = is_uop_installation;
        let conv = options.body_conv;
        spawn_task!(Loaded::Animations, move |r: &FileResolver| {
            AnimationLoader::load(r, version, uop, conv)
        });
        spawn_task!(Loaded::Art, move |r: &FileResolver| ArtLoader::load(r, uop));
        spawn_task!(Loaded::Gumps, move |r: &FileResolver| {
            GumpLoader::load(r, uop)
        });
        spawn_task!(Loaded::Hues, move |r: &FileResolver| {
            let radarcol = r.resolve_existing("radarcol.mul");
            HuesTable::load(r.resolve("hues.mul"), radarcol.as_deref())
        });
        spawn_task!(Loaded::TileData, move |r: &FileResolver| {
            TileData::load(r.resolve("tiledata.mul"), version)
        });
        let layouts = options.map_layouts;
        spawn_task!(Loaded::Maps, move |r: &FileResolver| {
            match layouts {
                Some(sizes) => MapLoader::load_with_sizes(r, version, uop, sizes),
                None => MapLoader::load(r, version, uop),
            }
        });
        spawn_task!(Loaded::Multis, move |r: &FileResolver| {
            MultiLoader::load(r, uop)
        });
        spawn_task!(Loaded::Skills, move |r: &FileResolver| SkillsLoader::load(r));
        spawn_task!(Loaded::Sounds, move |r: &FileResolver| {
            SoundLoader::load(r, uop)
        });
        spawn_task!(Loaded::Fonts, move |r: &FileResolver| FontsLoader::load(r));
        spawn_task!(Loaded::MultiMaps, move |r: &FileResolver| {
            MultiMapLoader::load(r)
        });
        drop(tx);

        let mut manager = Self {
            version,
            is_uop_installation,
            resolver: Arc::clone(&resolver),
            animations: None,
            art: None,
            gumps: None,
            hues: None,
            tiledata: None,
            maps: None,
            multis: None,
            skills: None,
            sounds: None,
            fonts: None,
            multimaps: None,
            verdata: None,
        };

        let deadline = started + options.timeout;
        for loaded in join_categories(&rx, expected, deadline)? {
            manager.store(loaded)?;
        }

        manager.apply_art_def();
        manager.apply_verdata(options.use_verdata);

        info!(elapsed = ?started.elapsed(), "client files loaded");

        Ok(manager)
    }

    /// The physical path resolver for this data directory.
    #[inline]
    pub fn resolver(&self) -> &FileResolver {
        &self.resolver
    }

    fn store(&mut self, loaded: Loaded) -> Result<()> {
        match loaded {
            Loaded::Animations(r) => self.animations = optional("animations", r)?,
            Loaded::Art(r) => self.art = mandatory("art", r)?,
            Loaded::Gumps(r) => self.gumps = optional("gumps", r)?,
            Loaded::Hues(r) => self.hues = mandatory("hues", r)?,
            Loaded::TileData(r) => self.tiledata = mandatory("tiledata", r)?,
            Loaded::Maps(r) => self.maps = mandatory("maps", r)?,
            Loaded::Multis(r) => self.multis = optional("multis", r)?,
            Loaded::Skills(r) => self.skills = optional("skills", r)?,
            Loaded::Sounds(r) => self.sounds = optional("sounds", r)?,
            Loaded::Fonts(r) => self.fonts = optional("fonts", r)?,
            Loaded::MultiMaps(r) => self.multimaps = optional("multimaps", r)?,
        }
        Ok(())
    }

    fn apply_art_def(&mut self) {
        let (Some(art), Some(tiledata)) = (self.art.as_mut(), self.tiledata.as_mut()) else {
            return;
        };
        let Some(path) = self.resolver.resolve_existing("art.def") else {
            return;
        };
        match DefReader::open(path, 1) {
            Ok(reader) => art.apply_art_def(reader, tiledata),
            Err(e) => warn!(error = %e, "art.def unreadable"),
        }
    }

    fn apply_verdata(&mut self, requested: bool) {
        let verdata = match self.resolver.resolve_existing("verdata.mul") {
            Some(path) => match Verdata::open(path) {
                Ok(verdata) => Some(verdata),
                Err(e) => {
                    warn!(error = %e, "verdata.mul unreadable");
                    None
                }
            },
            None => None,
        };

        // Old clients cannot run without their patch blob; newer ones take
        // it when asked, or when one with real content is present.
        let forced = self.version < ClientVersion::V_500A
            || verdata.as_ref().is_some_and(|v| !v.is_empty());
        let use_verdata = requested || forced;
        debug!(use_verdata, "verdata decision");

        let Some(verdata) = verdata else {
            return;
        };
        if !use_verdata || verdata.is_empty() {
            self.verdata = Some(verdata);
            return;
        }

        let source = verdata.source();
        if let Some(art) = self.art.as_mut() {
            art.table_mut().attach_verdata(Arc::clone(&source));
        }
        if let Some(gumps) = self.gumps.as_mut() {
            gumps.table_mut().attach_verdata(Arc::clone(&source));
        }
        if let Some(multis) = self.multis.as_mut() {
            multis.table_mut().attach_verdata(Arc::clone(&source));
        }
        if let Some(maps) = self.maps.as_mut() {
            maps.attach_verdata(Arc::clone(&source));
        }

        verdata.apply(PatchTargets {
            maps: self.maps.as_mut(),
            art: self.art.as_mut(),
            gumps: self.gumps.as_mut(),
            multis: self.multis.as_mut(),
            skills: self.skills.as_mut(),
            tiledata: self.tiledata.as_mut(),
            hues: self.hues.as_mut(),
        });

        self.verdata = Some(verdata);
    }
}

/// Collect `expected` finished categories or fail at the deadline.
fn join_categories(
    rx: &mpsc::Receiver<Loaded>,
    expected: usize,
    deadline: Instant,
) -> Result<Vec<Loaded>> {
    let mut finished = Vec::with_capacity(expected);
    for _ in 0..expected {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or(Duration::ZERO);
        let loaded = rx
            .recv_timeout(remaining)
            .map_err(|_| Error::LoadTimeout("category load deadline exceeded".into()))?;
        finished.push(loaded);
    }
    Ok(finished)
}

/// A missing optional category is disabled; other failures abort.
fn optional<T>(name: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::FileNotFound(path)) => {
            debug!(category = name, path = %path.display(), "category disabled");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Mandatory categories escalate even on a missing file.
fn mandatory<T>(name: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::FileNotFound(path)) => Err(Error::MandatoryMissing(format!(
            "{name}: {}",
            path.display()
        ))),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hung_category_is_load_timeout() {
        // A sender that never delivers stands in for a hung category task.
        let (tx, rx) = mpsc::channel::<Loaded>();
        let holder = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            drop(tx);
        });

        let deadline = Instant::now() + Duration::from_millis(20);
        let result = join_categories(&rx, 1, deadline);
        assert!(matches!(result, Err(Error::LoadTimeout(_))));
        holder.join().unwrap();
    }

    #[test]
    fn finished_categories_collected() {
        let (tx, rx) = mpsc::channel::<Loaded>();
        tx.send(Loaded::Skills(Ok(SkillsLoader::from_entries(Vec::new()))))
            .unwrap();
        drop(tx);

        let deadline = Instant::now() + Duration::from_secs(1);
        let finished = join_categories(&rx, 1, deadline).unwrap();
        assert_eq!(finished.len(), 1);
    }

    #[test]
    fn optional_vs_mandatory() {
        let missing: Result<()> = Err(Error::FileNotFound("x.mul".into()));
        assert!(optional("sounds", missing).unwrap().is_none());

        let missing: Result<()> = Err(Error::FileNotFound("hues.mul".into()));
        assert!(matches!(
            mandatory("hues", missing),
            Err(Error::MandatoryMissing(_))
        ));

        let broken: Result<()> = Err(Error::decode("boom"));
        assert!(optional("sounds", broken).is_err());
    }
}

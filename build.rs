//! Build script for infermpi
//!
//! Compiles the handle-table shim in `csrc/` against the system MPI and
//! links libmpi. Installations are probed in order, first hit wins:
//!
//! | Probe | Source |
//! |-------|--------|
//! | pkg-config | `MPI_PKG_CONFIG`, then `mpich`, `ompi`, `mpi` |
//! | compiler wrapper | `MPICC` or `mpicc`, via `-show` |
//! | install prefix | `CRAY_MPICH_DIR`, then common system prefixes |
//!
//! The include directories are re-exported through `links = "infermpi"`
//! metadata, so a dependent build script sees `DEP_INFERMPI_INCLUDE` (the
//! shim header) and `DEP_INFERMPI_MPI_INCLUDE` (MPI's own headers).

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHIM_DIR: &str = "csrc";

const SYSTEM_PREFIXES: &[&str] = &[
    "/usr",
    "/usr/local",
    "/usr/lib/x86_64-linux-gnu/openmpi",
    "/usr/lib64/mpich",
    "/usr/lib64/openmpi",
    "/opt/mpich",
    "/opt/openmpi",
];

/// Library directory layouts seen under an install prefix.
const LIB_DIRS: &[&str] = &["lib", "lib64", "lib/x86_64-linux-gnu"];

fn main() {
    println!("cargo:rerun-if-changed={SHIM_DIR}/infermpi.c");
    println!("cargo:rerun-if-changed={SHIM_DIR}/infermpi.h");
    for var in ["MPI_PKG_CONFIG", "MPICC", "CRAY_MPICH_DIR"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let Some((probe, mpi)) = probes().into_iter().find_map(|p| p.run().map(|m| (p, m))) else {
        panic!(
            "infermpi: no MPI installation found. Install MPICH or Open MPI, then either:\n\
             - set MPI_PKG_CONFIG to the pkg-config name (e.g. 'mpich' or 'ompi')\n\
             - put 'mpicc' on PATH (or point MPICC at it)\n\
             - set CRAY_MPICH_DIR on Cray systems"
        );
    };
    eprintln!("infermpi: using MPI from {probe}");

    compile_shim(&mpi);
    mpi.emit_link();
    mpi.emit_metadata();
}

fn compile_shim(mpi: &MpiConfig) {
    let mut build = cc::Build::new();
    build
        .file(Path::new(SHIM_DIR).join("infermpi.c"))
        .include(SHIM_DIR)
        .includes(&mpi.include_paths)
        .warnings(true)
        .extra_warnings(true);

    if env::var_os("CARGO_FEATURE_DEBUG").is_some() {
        build.define("INFERMPI_DEBUG", None);
    }
    if env::var("PROFILE").as_deref() == Ok("release") {
        build.opt_level(3);
    }

    build.compile("infermpi");
}

/// One way of locating MPI.
enum Probe {
    PkgConfig(String),
    Wrapper(String),
    Prefix(PathBuf),
}

impl std::fmt::Display for Probe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Probe::PkgConfig(name) => write!(f, "pkg-config '{name}'"),
            Probe::Wrapper(cc) => write!(f, "'{cc} -show'"),
            Probe::Prefix(dir) => write!(f, "prefix {}", dir.display()),
        }
    }
}

fn probes() -> Vec<Probe> {
    let mut probes = Vec::new();
    if let Ok(name) = env::var("MPI_PKG_CONFIG") {
        probes.push(Probe::PkgConfig(name));
    }
    probes.extend(["mpich", "ompi", "mpi"].map(|n| Probe::PkgConfig(n.to_string())));
    probes.push(Probe::Wrapper(
        env::var("MPICC").unwrap_or_else(|_| "mpicc".to_string()),
    ));
    if let Ok(dir) = env::var("CRAY_MPICH_DIR") {
        probes.push(Probe::Prefix(PathBuf::from(dir)));
    }
    probes.extend(SYSTEM_PREFIXES.iter().map(|p| Probe::Prefix(PathBuf::from(p))));
    probes
}

impl Probe {
    fn run(&self) -> Option<MpiConfig> {
        match self {
            Probe::PkgConfig(name) => pkg_config::Config::new()
                .cargo_metadata(false)
                .probe(name)
                .ok()
                .map(|lib| MpiConfig {
                    include_paths: lib.include_paths,
                    link_paths: lib.link_paths,
                    libs: lib.libs,
                    version: Some(lib.version),
                }),
            Probe::Wrapper(cc) => {
                let output = Command::new(cc).arg("-show").output().ok()?;
                if !output.status.success() {
                    return None;
                }
                Some(MpiConfig::from_wrapper_flags(&String::from_utf8_lossy(
                    &output.stdout,
                )))
            }
            Probe::Prefix(dir) => MpiConfig::from_prefix(dir),
        }
    }
}

#[derive(Default)]
struct MpiConfig {
    include_paths: Vec<PathBuf>,
    link_paths: Vec<PathBuf>,
    libs: Vec<String>,
    version: Option<String>,
}

impl MpiConfig {
    /// A prefix qualifies when it has `include/mpi.h`; every library layout
    /// that exists under it is searched.
    fn from_prefix(prefix: &Path) -> Option<Self> {
        let include = prefix.join("include");
        if !include.join("mpi.h").exists() {
            return None;
        }
        let link_paths: Vec<PathBuf> = LIB_DIRS
            .iter()
            .map(|d| prefix.join(d))
            .filter(|d| d.is_dir())
            .collect();
        Some(MpiConfig {
            include_paths: vec![include],
            link_paths,
            libs: vec!["mpi".to_string()],
            version: None,
        })
    }

    /// Pull `-I`, `-L`, `-l` and `-Wl,-rpath,<dir>` out of a wrapper's
    /// `-show` line. Anything else (compiler name, `-pthread`, ...) is noise.
    fn from_wrapper_flags(line: &str) -> Self {
        let mut config = MpiConfig::default();
        for flag in line.split_whitespace() {
            if let Some(dir) = flag.strip_prefix("-I") {
                push_unique(&mut config.include_paths, PathBuf::from(dir));
            } else if let Some(dir) = flag
                .strip_prefix("-L")
                .or_else(|| flag.strip_prefix("-Wl,-rpath,"))
            {
                push_unique(&mut config.link_paths, PathBuf::from(dir));
            } else if let Some(lib) = flag.strip_prefix("-l") {
                push_unique(&mut config.libs, lib.to_string());
            }
        }
        if config.libs.is_empty() {
            config.libs.push("mpi".to_string());
        }
        config
    }

    fn emit_link(&self) {
        for dir in &self.link_paths {
            println!("cargo:rustc-link-search=native={}", dir.display());
            // Run against the libmpi we linked, not whatever is first on the loader path.
            println!("cargo:rustc-link-arg=-Wl,-rpath,{}", dir.display());
        }
        for lib in &self.libs {
            println!("cargo:rustc-link-lib={lib}");
        }
        if let Some(version) = &self.version {
            println!("cargo:rustc-env=MPI_VERSION={version}");
        }
    }

    fn emit_metadata(&self) {
        let shim = env::var("CARGO_MANIFEST_DIR")
            .map(|root| PathBuf::from(root).join(SHIM_DIR))
            .unwrap_or_else(|_| PathBuf::from(SHIM_DIR));
        println!("cargo:include={}", shim.display());
        if let Ok(joined) = env::join_paths(&self.include_paths) {
            println!("cargo:mpi_include={}", joined.to_string_lossy());
        }
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

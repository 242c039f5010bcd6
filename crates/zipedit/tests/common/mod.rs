#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::sync::{Arc, OnceLock};
#[cfg(unix)]
use tempfile::TempDir;
#[cfg(unix)]
use zipedit::{ArchiveSlot, ContentPipeline, Settings};

/// Stand-in for 7-Zip. Entries live as plain files under `<archive>.store`;
/// `<archive>.store/.password` makes extraction demand that password,
/// `<archive>.store/.soft-errors` adds a per-file error line to an otherwise
/// successful extraction, and `<archive>.fail` makes every call exit with the
/// code it contains. Each call appends `<cwd>|<args>` to `<archive>.args`, and
/// each add appends the staged file names to `<archive>.staged`.
#[cfg(unix)]
const FAKE_TOOL: &str = r#"#!/bin/sh
all="$*"
mode="$1"
shift
archive=""
out=""
pw=""
file=""
for arg in "$@"; do
  case "$arg" in
    -o*) out="${arg#-o}" ;;
    -p*) pw="${arg#-p}" ;;
    -y|-scsUTF-8|-bb1) ;;
    *) if [ -z "$archive" ]; then archive="$arg"; else file="$arg"; fi ;;
  esac
done
store="$archive.store"
printf '%s|%s\n' "$PWD" "$all" >> "$archive.args"
if [ -f "$archive.fail" ]; then
  echo "ERROR: simulated failure" >&2
  exit "$(cat "$archive.fail")"
fi
case "$mode" in
  x)
    if [ -f "$store/.password" ] && [ "$pw" != "$(cat "$store/.password")" ]; then
      echo "ERROR: Wrong password : $file" >&2
      exit 2
    fi
    echo "Extracting archive: $archive"
    if [ -f "$store/$file" ]; then
      mkdir -p "$(dirname "$out/$file")"
      cp "$store/$file" "$out/$file"
      echo "- $file"
    fi
    if [ -f "$store/.soft-errors" ]; then
      echo "ERROR: CRC Failed : $file"
    fi
    echo "Everything is Ok"
    ;;
  a)
    find . -type f | sed 's|^\./||' >> "$archive.staged"
    src="$file"
    # Stand in for a filesystem that matches names across Unicode normal forms
    if [ ! -f "$src" ]; then
      src="$(find . -type f | head -n 1)"
    fi
    mkdir -p "$(dirname "$store/$file")"
    cp "$src" "$store/$file"
    ;;
  *)
    echo "ERROR: unsupported command $mode" >&2
    exit 7
    ;;
esac
exit 0
"#;

/// Path of the fake tool, written once per test binary.
#[cfg(unix)]
pub fn fake_tool() -> &'static Path {
    static TOOL: OnceLock<PathBuf> = OnceLock::new();
    TOOL.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fake-7z.sh");

        // Write then rename, so the script is never executed half-written
        let staging = dir.join(format!("fake-7z.{}.tmp", std::process::id()));
        fs::write(&staging, FAKE_TOOL).unwrap();
        fs::set_permissions(&staging, fs::Permissions::from_mode(0o755)).unwrap();
        fs::rename(&staging, &path).unwrap();
        path
    })
}

/// An archive backed by the fake tool, with its own scratch root.
#[cfg(unix)]
pub struct Fixture {
    pub dir: TempDir,
    pub archive: PathBuf,
    pub scratch_root: PathBuf,
}

#[cfg(unix)]
impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("sample.zip");
        let scratch_root = dir.path().join("scratch");
        fs::create_dir_all(archive.with_extension("zip.store")).unwrap();
        fs::create_dir_all(&scratch_root).unwrap();
        Self {
            dir,
            archive,
            scratch_root,
        }
    }

    fn store(&self) -> PathBuf {
        self.archive.with_extension("zip.store")
    }

    fn side_file(&self, suffix: &str) -> PathBuf {
        self.archive.with_extension(format!("zip.{}", suffix))
    }

    pub fn put(&self, entry: &str, bytes: &[u8]) {
        let path = self.store().join(entry);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    pub fn stored(&self, entry: &str) -> Option<Vec<u8>> {
        fs::read(self.store().join(entry)).ok()
    }

    pub fn require_password(&self, password: &str) {
        fs::write(self.store().join(".password"), password).unwrap();
    }

    pub fn report_soft_errors(&self) {
        fs::write(self.store().join(".soft-errors"), "").unwrap();
    }

    pub fn fail_with(&self, code: i32) {
        fs::write(self.side_file("fail"), code.to_string()).unwrap();
    }

    pub fn stop_failing(&self) {
        fs::remove_file(self.side_file("fail")).unwrap();
    }

    /// `(cwd, args)` of every tool invocation so far.
    pub fn tool_calls(&self) -> Vec<(String, String)> {
        fs::read_to_string(self.side_file("args"))
            .unwrap_or_default()
            .lines()
            .filter_map(|l| l.split_once('|'))
            .map(|(cwd, args)| (cwd.to_string(), args.to_string()))
            .collect()
    }

    /// Files found in the working directory of every add so far.
    pub fn staged_files(&self) -> Vec<String> {
        fs::read_to_string(self.side_file("staged"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(&self.scratch_root).unwrap().count()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            seven_zip_path: Some(fake_tool().to_path_buf()),
            scratch_root: Some(self.scratch_root.clone()),
            ..Settings::default()
        }
    }

    /// Pipeline with the fixture archive already open.
    pub fn pipeline(&self) -> ContentPipeline {
        let pipeline = ContentPipeline::from_settings(&self.settings(), Arc::new(ArchiveSlot::new()));
        assert!(pipeline.slot().try_set(&self.archive));
        pipeline
    }
}

/// Write a real ZIP archive with the `zip` crate.
pub fn create_zip(path: &Path, files: &[(&str, &[u8])]) -> std::io::Result<()> {
    use zip::write::{SimpleFileOptions, ZipWriter};

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);

    for (name, content) in files {
        if name.ends_with('/') {
            zip.add_directory(*name, SimpleFileOptions::default())?;
        } else {
            zip.start_file(*name, SimpleFileOptions::default())?;
            zip.write_all(content)?;
        }
    }

    zip.finish()?;
    Ok(())
}

//! On-disk fixtures: a pristine upstream tree and recipe assets.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::recipe::Recipe;

pub const ZLIB_H: &str = r#"/* zlib.h -- interface of the 'zlib' general purpose compression library
  version 1.2.11, January 15th, 2017

  Copyright (C) 1995-2017 Jean-loup Gailly and Mark Adler
*/

#ifndef ZLIB_H
#define ZLIB_H

#include "zconf.h"

#define ZLIB_VERSION "1.2.11"
#define ZLIB_VERNUM 0x12b0

#endif /* ZLIB_H */
"#;

pub const ZCONF_H: &str = r#"/* zconf.h -- configuration of the zlib compression library */
#ifndef ZCONF_H
#define ZCONF_H

#ifdef HAVE_UNISTD_H    /* may be set to #if 1 by ./configure */
#  define Z_HAVE_UNISTD_H
#endif

#ifdef HAVE_STDARG_H    /* may be set to #if 1 by ./configure */
#  define Z_HAVE_STDARG_H
#endif

#endif /* ZCONF_H */
"#;

pub const GZGUTS_H: &str = r#"/* gzguts.h -- zlib internal header definitions for gz* operations */
#if defined(_WIN32) || defined(__CYGWIN__)
#  define WIDECHAR
#endif
"#;

pub const CONFIGURE: &str = r#"#!/bin/sh
# configure script for zlib.
LDSHARED=${LDSHARED-"$cc -shared"}
echo "$LDSHARED $SFLAGS -o libz.so"
"#;

pub const MAKEFILE_IN: &str = r#"# Makefile for zlib
example$(EXE): example.o $(STATICLIB)
	$(CC) $(CFLAGS) -o $@ example.o $(TEST_LDFLAGS)
"#;

pub const ZIP_H: &str = "/* zip.h -- IO on .zip files using zlib */\n";
pub const IOAPI_H: &str = "/* ioapi.h -- IO base function header for compress/uncompress .zip */\n#include \"zlib.h\"\n";

/// Write a miniature zlib 1.2.11 source tree under `dir/pristine`
/// containing every anchor the recipe edits.
pub fn pristine_tree(dir: &Path) -> PathBuf {
    let root = dir.join("pristine");
    let files: &[(&str, &str)] = &[
        ("zlib.h", ZLIB_H),
        ("zconf.h", ZCONF_H),
        ("zconf.h.cmakein", ZCONF_H),
        ("zconf.h.in", ZCONF_H),
        ("gzguts.h", GZGUTS_H),
        ("configure", CONFIGURE),
        ("Makefile.in", MAKEFILE_IN),
        ("CMakeLists.txt", "project(zlib C)\n"),
        ("contrib/minizip/zip.h", ZIP_H),
        ("contrib/minizip/ioapi.h", IOAPI_H),
    ];

    for (path, contents) in files {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    root
}

/// Write recipe assets under `dir/assets` and return a recipe using them.
pub fn recipe_with_assets(dir: &Path) -> Recipe {
    let assets = dir.join("assets");
    fs::create_dir_all(&assets).unwrap();
    fs::write(assets.join("FindZLIB.cmake"), "# FindZLIB\nfind_path(ZLIB_INCLUDE_DIR zlib.h)\n").unwrap();
    fs::write(
        assets.join("CMakeLists_minizip.txt"),
        "project(minizip C)\nadd_library(minizip zip.c ioapi.c)\n",
    )
    .unwrap();

    Recipe {
        assets_dir: assets,
        ..Recipe::default()
    }
}

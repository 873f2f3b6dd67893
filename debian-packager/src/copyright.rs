// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Generation of machine-readable `copyright` files.

See <https://www.debian.org/doc/packaging-manuals/copyright-format/1.0/>.
All content is attributed to the package maintainer under the MIT license.
*/

use {
    crate::{context::BuildContext, error::Result, io::write_file, spec::PackageSpec},
    chrono::Datelike,
    std::path::PathBuf,
};

const FORMAT_URL: &str = "http://www.debian.org/doc/packaging-manuals/copyright-format/1.0/";

/// Render the `copyright` file for a package.
///
/// `year` is embedded in copyright statements.
pub fn render_copyright(spec: &PackageSpec, year: i32) -> String {
    let name = &spec.name;
    let maintainer = &spec.maintainer;

    let mut s = String::new();
    s.push_str(&format!("Format: {}\n", FORMAT_URL));
    s.push_str(&format!("Upstream-Name: {}\n", name));
    s.push_str(&format!(
        "Upstream-Contact: {} <{}>\n",
        maintainer, spec.maintainer_email
    ));
    s.push_str(&format!(
        "Source: {}\n",
        spec.xsource.as_deref().unwrap_or_default()
    ));

    for files in ["*", "debian/*"] {
        s.push_str(&format!(
            "\nFiles: {}\nCopyright:\n    {}, {}\nLicense: MIT\n",
            files, year, maintainer
        ));
    }

    s.push_str(&format!(
        "\nLicense: MIT\n    Copyright (c) {} {}\n\n",
        year, maintainer
    ));
    s.push_str(&format!(
        "    Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated\n    \
         documentation files (the \"{}\"), to deal in the Software without restriction, including without limitation\n    \
         the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software,\n    \
         and to permit persons to whom the Software is furnished to do so, subject to the following conditions:\n\n",
        name
    ));
    s.push_str(
        "    The above copyright notice and this permission notice shall be included in all copies or substantial portions\n    \
         of the Software.\n\n",
    );
    s.push_str(
        "    THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED\n    \
         TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL\n    \
         THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION\n    \
         OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER\n    \
         DEALINGS IN THE SOFTWARE.\n",
    );

    s
}

/// The current year in local time.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Write `usr/share/doc/<name>/copyright`, replacing previous content.
pub fn write_copyright(context: &BuildContext, spec: &PackageSpec, year: i32) -> Result<PathBuf> {
    let path = context.doc_dir(&spec.name).join("copyright");
    write_file(&path, render_copyright(spec, year).as_bytes())?;

    Ok(path)
}

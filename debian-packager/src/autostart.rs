// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! XDG autostart desktop entries.

Entries are installed to `/etc/xdg/autostart` and registered as conffiles so
local edits survive upgrades.
*/

use {
    crate::{
        context::BuildContext,
        error::Result,
        io::write_file,
        spec::{Autostart, PackageSpec},
        stage::ConffileRegistry,
    },
    log::info,
};

/// Install directory of autostart entries.
pub const AUTOSTART_DIR: &str = "/etc/xdg/autostart";

/// Render a `.desktop` file for an autostart entry.
pub fn render_desktop_entry(entry: &Autostart, spec: &PackageSpec) -> String {
    [
        "[Desktop Entry]".to_string(),
        format!("Version={}", spec.version),
        format!("Name={}", entry.name),
        format!("Comment={}", spec.short_description),
        format!("Exec={}", entry.command),
        "Terminal=false".to_string(),
        "Type=Application".to_string(),
        "StartupNotify=false".to_string(),
        String::new(),
    ]
    .join("\n")
}

/// Write every autostart entry of a package and register each as a conffile.
pub fn write_autostart_entries(
    context: &BuildContext,
    spec: &PackageSpec,
    conffiles: &mut ConffileRegistry,
) -> Result<()> {
    for entry in &spec.autostart {
        let install_path = format!("{}/{}.desktop", AUTOSTART_DIR, entry.name);
        let path = context.staged_path(&install_path);
        info!("writing autostart entry {}", path.display());

        write_file(&path, render_desktop_entry(entry, spec).as_bytes())?;
        conffiles.register(install_path)?;
    }

    Ok(())
}

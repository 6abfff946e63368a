//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command. Exported vault documents
//! are the one exception: they are written raw by `vault::export`.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::DecryptedVault;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a two-column Field/Value table.
pub fn print_fields_table(rows: &[(&str, String)]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    for (field, value) in rows {
        table.add_row(vec![field.to_string(), value.clone()]);
    }

    println!("{table}");
}

/// Print the readable summary of a vault, then its key shares.
///
/// Share material is shown only when `show_keyshares` is set; otherwise
/// just its length.
pub fn print_vault_table(vault: &DecryptedVault, show_keyshares: bool) {
    let lib_type = vault
        .lib_type()
        .map_or_else(|| format!("UNKNOWN ({})", vault.lib_type_id), |t| t.as_str().to_string());
    let created = vault
        .created_at
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    print_fields_table(&[
        ("Name", vault.name.clone()),
        ("Library", lib_type),
        ("Local party", vault.local_party_id.clone()),
        ("Signers", vault.signers.join(", ")),
        (
            "Threshold",
            format!("{} of {}", vault.threshold(), vault.signers.len()),
        ),
        ("ECDSA public key", vault.public_key_ecdsa.clone()),
        ("EdDSA public key", vault.public_key_eddsa.clone()),
        ("Chain code", vault.hex_chain_code.clone()),
        ("Created", created),
    ]);

    if vault.key_shares.is_empty() {
        warning("Vault contains no key shares.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Public key", "Key share"]);

    for share in &vault.key_shares {
        let material = if show_keyshares {
            share.keyshare.as_str().to_owned()
        } else {
            format!("{} chars (hidden)", share.keyshare.len())
        };
        table.add_row(vec![share.public_key.clone(), material]);
    }

    println!("{table}");
}

//! User-facing reply text.
//!
//! A plain lookup keyed by the user's stored language preference, not
//! a localization system. Unknown languages fall back to English.

use crate::auth::LinkOutcome;
use crate::dispatch::ArchiveOutcome;

/// Languages with translated reply text.
pub const SUPPORTED_LANGS: [&str; 2] = ["en", "de"];

fn is_de(lang: &str) -> bool {
    lang.eq_ignore_ascii_case("de")
}

pub fn welcome(lang: &str) -> String {
    if is_de(lang) {
        "Hallo! Ich archiviere Gruppennachrichten in Google Drive.\n\
         In einer Gruppe: /setup. Danach hier privat: /link und /verify."
            .to_string()
    } else {
        "Hi! I archive group messages into Google Drive.\n\
         In a group, run /setup. Then, here in private, run /link and /verify."
            .to_string()
    }
}

pub fn setup_group_only(lang: &str) -> String {
    if is_de(lang) {
        "/setup funktioniert nur in Gruppen.".to_string()
    } else {
        "/setup only works inside a group.".to_string()
    }
}

pub fn admin_only(lang: &str) -> String {
    if is_de(lang) {
        "Nur Gruppenadmins können die Einstellungen ändern.".to_string()
    } else {
        "Only group administrators can change these settings.".to_string()
    }
}

pub fn setup_done(lang: &str) -> String {
    if is_de(lang) {
        "Eingerichtet. Schreib mir privat /link, um dein Google-Konto zu verbinden."
            .to_string()
    } else {
        "Set up. Message me /link in private to connect your Google account.".to_string()
    }
}

pub fn link_started(lang: &str, user_code: &str, verification_url: &str) -> String {
    if is_de(lang) {
        format!(
            "Öffne {} und gib diesen Code ein: {}\nDanach hier /verify ausführen.",
            verification_url, user_code
        )
    } else {
        format!(
            "Open {} and enter this code: {}\nThen run /verify here.",
            verification_url, user_code
        )
    }
}

pub fn link_no_setup(lang: &str) -> String {
    if is_de(lang) {
        "Zuerst /setup in der Gruppe ausführen, die archiviert werden soll.".to_string()
    } else {
        "First run /setup in the group you want archived.".to_string()
    }
}

pub fn verify_outcome(lang: &str, outcome: LinkOutcome) -> String {
    match outcome {
        LinkOutcome::Authorized => {
            if is_de(lang) {
                "Verbunden. Die Gruppe ist jetzt mit deinem Google Drive verknüpft.".to_string()
            } else {
                "Connected. The group is now linked to your Google Drive.".to_string()
            }
        }
        LinkOutcome::Denied => {
            if is_de(lang) {
                "Zugriff abgelehnt. Mit /link neu starten.".to_string()
            } else {
                "Access was denied. Start again with /link.".to_string()
            }
        }
        LinkOutcome::Expired => {
            if is_de(lang) {
                "Der Code ist abgelaufen. Mit /link neu starten.".to_string()
            } else {
                "The code expired. Start again with /link.".to_string()
            }
        }
        LinkOutcome::TimedOut => {
            if is_de(lang) {
                "Noch keine Bestätigung. Code eingeben und /verify erneut ausführen."
                    .to_string()
            } else {
                "Not confirmed yet. Enter the code and run /verify again.".to_string()
            }
        }
        LinkOutcome::NotStarted => {
            if is_de(lang) {
                "Kein Verbindungsvorgang aktiv. Zuerst /link ausführen.".to_string()
            } else {
                "No link in progress. Run /link first.".to_string()
            }
        }
    }
}

pub fn unlinked(lang: &str) -> String {
    if is_de(lang) {
        "Verknüpfung entfernt. Bereits archivierte Dateien bleiben in Drive.".to_string()
    } else {
        "Unlinked. Files already archived stay in Drive.".to_string()
    }
}

pub fn mode_set(lang: &str, auto: bool) -> String {
    match (is_de(lang), auto) {
        (true, true) => "Modus: automatisch. Neue Nachrichten werden archiviert.".to_string(),
        (true, false) => {
            "Modus: Antwort. Mit /archive auf eine Nachricht antworten, um sie zu archivieren."
                .to_string()
        }
        (false, true) => "Mode: auto. New messages will be archived.".to_string(),
        (false, false) => {
            "Mode: reply. Reply to a message with /archive to archive it.".to_string()
        }
    }
}

pub fn interval_prompt(lang: &str) -> String {
    if is_de(lang) {
        "Benachrichtigungsintervall in Stunden senden (1-24).".to_string()
    } else {
        "Send the notify interval in hours (1-24).".to_string()
    }
}

pub fn interval_set(lang: &str, hours: u8) -> String {
    if is_de(lang) {
        format!("Intervall auf {} Stunden gesetzt.", hours)
    } else {
        format!("Interval set to {} hours.", hours)
    }
}

pub fn interval_invalid(lang: &str) -> String {
    if is_de(lang) {
        "Bitte eine Zahl zwischen 1 und 24 senden.".to_string()
    } else {
        "Please send a number between 1 and 24.".to_string()
    }
}

pub fn keywords_prompt(lang: &str) -> String {
    if is_de(lang) {
        "Stichwörter durch Kommas getrennt senden (max. 20).".to_string()
    } else {
        "Send trigger keywords separated by commas (20 max).".to_string()
    }
}

pub fn keywords_set(lang: &str, count: usize) -> String {
    if is_de(lang) {
        format!("{} Stichwörter gespeichert.", count)
    } else {
        format!("Saved {} keywords.", count)
    }
}

pub fn lang_set(lang: &str) -> String {
    if is_de(lang) {
        "Sprache auf Deutsch gestellt.".to_string()
    } else {
        "Language set to English.".to_string()
    }
}

pub fn lang_invalid(lang: &str) -> String {
    let supported = SUPPORTED_LANGS.join(", ");
    if is_de(lang) {
        format!("Unbekannte Sprache. Verfügbar: {}", supported)
    } else {
        format!("Unknown language. Available: {}", supported)
    }
}

pub fn archive_outcome(lang: &str, outcome: &ArchiveOutcome) -> String {
    match outcome {
        ArchiveOutcome::StoredText => {
            if is_de(lang) {
                "Text im Archivblatt gespeichert.".to_string()
            } else {
                "Text saved to the archive sheet.".to_string()
            }
        }
        ArchiveOutcome::StoredMedia(kind) => {
            if is_de(lang) {
                format!("Datei im Ordner {} gespeichert.", kind.folder_name())
            } else {
                format!("File saved to the {} folder.", kind.folder_name())
            }
        }
        ArchiveOutcome::NotLinked => {
            if is_de(lang) {
                "Kein Google-Konto verknüpft. Privat /link ausführen.".to_string()
            } else {
                "No Google account linked. Run /link in private.".to_string()
            }
        }
        ArchiveOutcome::RelinkRequired => {
            if is_de(lang) {
                "Der Google-Zugriff wurde widerrufen. Bitte privat /link und /verify erneut ausführen."
                    .to_string()
            } else {
                "Google access was revoked. Please run /link and /verify again in private."
                    .to_string()
            }
        }
        ArchiveOutcome::NotEnabled => {
            if is_de(lang) {
                "Archivierung ist hier deaktiviert.".to_string()
            } else {
                "Archiving is switched off here.".to_string()
            }
        }
        ArchiveOutcome::ReplyRequired => {
            if is_de(lang) {
                "Auf die zu archivierende Nachricht antworten.".to_string()
            } else {
                "Reply to the message you want archived.".to_string()
            }
        }
        ArchiveOutcome::NoContent => {
            if is_de(lang) {
                "Diese Nachricht enthält nichts Archivierbares.".to_string()
            } else {
                "That message has nothing I can archive.".to_string()
            }
        }
        ArchiveOutcome::Failed(error) => {
            if is_de(lang) {
                format!("Archivierung fehlgeschlagen: {}", error)
            } else {
                format!("Archiving failed: {}", error)
            }
        }
    }
}

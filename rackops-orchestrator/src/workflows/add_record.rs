//! Interactive A-record creation: pick (or create) a zone, then describe the record.

use super::{print_record, Outcome, Session, ZONE_PAGE_SIZE};
use crate::console::Console;
use rackops_common::validate::{is_valid_ipv4, parse_ttl, record_name, MIN_DNS_TTL};
use rackops_common::{NewRecord, NewZone, RackopsError, RecordType, Zone};
use rackops_providers::{list_all_zones, DnsProvider};
use std::io::BufRead;

const ZONE_COMMENT: &str = "Created through rackops";

/// Read one answer; a closed input stream ends the dialogue.
fn ask(input: &mut impl BufRead, console: &mut Console, question: &str) -> Result<String, RackopsError> {
    console.prompt(question);
    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        console.end_progress();
        return Err(RackopsError::InvalidInput("input closed before an answer was given".to_string()));
    }
    Ok(answer.trim().to_string())
}

fn ask_non_empty(
    input: &mut impl BufRead,
    console: &mut Console,
    question: &str,
) -> Result<String, RackopsError> {
    loop {
        let answer = ask(input, console, question)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
        console.line("A value is required, please try again.");
    }
}

fn ask_ttl(input: &mut impl BufRead, console: &mut Console, record: &str) -> Result<u32, RackopsError> {
    let question = format!("Please enter the {} record TTL (in seconds): ", record);
    loop {
        let answer = ask(input, console, &question)?;
        match parse_ttl(&answer, MIN_DNS_TTL) {
            Some(ttl) => return Ok(ttl),
            None => console.line(format!(
                "TTL must be an integer of at least {}s, please try again.",
                MIN_DNS_TTL
            )),
        }
    }
}

async fn create_first_zone(
    dns: &dyn DnsProvider,
    input: &mut impl BufRead,
    console: &mut Console,
) -> Result<Zone, RackopsError> {
    console.line("You have no domains/zones at this time");
    let name = ask_non_empty(input, console, "Please enter a zone name to create: ")?;
    let email = ask_non_empty(input, console, "Please enter an e-mail contact for the zone: ")?;
    let ttl = ask_ttl(input, console, "NS")?;
    let zone = dns
        .create_zone(&NewZone {
            name,
            email,
            ttl,
            comment: Some(ZONE_COMMENT.to_string()),
        })
        .await?;
    console.line(format!("Zone created: {}", zone.name));
    Ok(zone)
}

fn choose_zone(
    zones: &[Zone],
    input: &mut impl BufRead,
    console: &mut Console,
) -> Result<Zone, RackopsError> {
    console.line("Available zones/domains:");
    for (pos, zone) in zones.iter().enumerate() {
        console.line(format!("{:2}) {}", pos, zone.name));
    }
    loop {
        let answer = ask(input, console, "Select a zone to add A record to: ")?;
        match answer.parse::<i64>() {
            Ok(n) => match usize::try_from(n).ok().and_then(|i| zones.get(i)) {
                Some(zone) => return Ok(zone.clone()),
                None => console.line("Invalid selection. Please try again."),
            },
            Err(_) => console.line("Selection must be an integer listed above, please try again."),
        }
    }
}

/// Walk the user through adding an A record, reading answers from `input`.
pub async fn run(session: &mut Session, input: &mut impl BufRead) -> Result<Outcome, RackopsError> {
    let Session { cloud, console, .. } = session;
    let dns = cloud.dns.as_ref();

    console.line("-- Application to add an A record to Cloud DNS zone");
    let zones = list_all_zones(dns, ZONE_PAGE_SIZE).await?;
    tracing::debug!("{} zone(s) on account", zones.len());
    let zone = if zones.is_empty() {
        create_first_zone(dns, input, console).await?
    } else {
        choose_zone(&zones, input, console)?
    };

    console.line("Subdomain prefix required to complete the record creation");
    console.line("\tIt will be added to the zone selected/created above");
    let prefix = ask(
        input,
        console,
        "Please enter the prefix for the record (e.g. 'mail', or nothing/<RETURN> for the base record): ",
    )?;
    let name = record_name(&prefix, &zone.name);

    let address = loop {
        let answer = ask(input, console, "Please enter a valid IPv4 address to resolve to: ")?;
        if is_valid_ipv4(&answer) {
            break answer;
        }
        console.line("Invalid IP address specified, please try again");
    };
    let ttl = ask_ttl(input, console, "A")?;

    let record = dns
        .add_record(
            &zone.id,
            &NewRecord {
                record_type: RecordType::A,
                name,
                data: address,
                ttl,
            },
        )
        .await?;
    print_record(console, &record);
    console.line("Complete");
    Ok(Outcome::Completed)
}

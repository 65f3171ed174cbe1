//! Demo binary for the medical center.
//!
//! Loads configuration (an optional JSON file given as the first argument,
//! then `MEDCENTER_*` overrides), installs the shared center, seeds it with a
//! small roster and prints the availability that results. A second argument
//! names a `.xml` or `.json` file to export the seeded center to.

use anyhow::Context;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Weekday};
use medcenter::{
    instance, logging, Appointment, Center, CenterConfig, CenterResult, MemoryStore, Patient,
    Person, Professional, WeeklySchedule,
};
use std::env;
use tracing::info;

const DOCTOR: &str = "20111222";

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);

    let config = match args.next() {
        Some(path) => CenterConfig::from_json_file(&path)
            .with_context(|| format!("could not load config from {}", path))?,
        None => CenterConfig::default(),
    };
    let config = config
        .with_env_overrides()
        .context("invalid MEDCENTER_* environment")?;
    logging::init(&config.log_filter);

    let center = Center::from_config(&config, Box::new(MemoryStore::new()))
        .context("could not build the center")?;
    instance::get_or_create(&config.name);
    instance::replace(center).context("could not install the shared center")?;

    let monday = instance::with_center(seed).context("could not seed the center")?;
    info!(%monday, "demo center seeded");

    print_header()?;
    print_week(monday)?;
    print_appointments()?;
    print_double_booking(monday)?;

    if let Some(path) = args.next() {
        instance::with_center(|center| center.export_center(&path))
            .with_context(|| format!("could not export to {}", path))?;
        println!("\nCenter written to {}", path);
    }
    Ok(())
}

fn seed(center: &mut Center) -> CenterResult<NaiveDate> {
    let nine = hm(9, 0);
    let noon = hm(12, 0);
    let schedule =
        WeeklySchedule::attending(&[Weekday::Mon, Weekday::Wed, Weekday::Fri], nine, noon)?;

    center.add_specialty("cardiologia")?;
    let doctor = Professional::new(DOCTOR, "Luis", "Perez", "011-4000", schedule)?
        .with_specialty("Cardiologia");
    let ana = Patient::new("30111222", "Ana", "Lopez", "011-4555")?;
    let juan = Patient::new("30999888", "Juan", "Gomez", "011-4666")?;
    center.add_persons(vec![ana.clone(), juan.clone()])?;
    center.add_person(doctor.clone())?;

    let monday = next_monday(Local::now().date_naive());
    center.add_appointment(Appointment::new(&ana, &doctor, monday.and_time(nine)))?;
    center.add_appointment(Appointment::new(
        &juan,
        &doctor,
        (monday + Duration::days(2)).and_time(hm(10, 30)),
    ))?;
    Ok(monday)
}

fn print_header() -> CenterResult<()> {
    instance::with_center(|center| {
        println!("\n{}", "=".repeat(60));
        println!("       {}", center.name().to_uppercase());
        println!("{}", "=".repeat(60));
        println!(
            "Slot duration: {} | patients: {} | professionals: {}",
            center.appointment_duration(),
            center.patients().len(),
            center.professionals().len()
        );
        Ok(())
    })
}

fn print_week(monday: NaiveDate) -> CenterResult<()> {
    instance::with_center(|center| {
        let doctor = center.find_professional(DOCTOR)?;
        let sunday = monday + Duration::days(6);

        println!(
            "\n--- Open slots for {} ({} to {}) ---",
            doctor.full_name(),
            monday,
            sunday
        );
        for date in center.available_dates_for(&doctor, monday, sunday)? {
            let slots = center.available_slots_for(&doctor, date)?;
            let times: Vec<String> = slots.iter().map(|t| t.format("%H:%M").to_string()).collect();
            println!("\n{} ({} open):", date.format("%A, %Y-%m-%d"), slots.len());
            println!("  {}", times.join(" "));
        }
        Ok(())
    })
}

fn print_appointments() -> CenterResult<()> {
    instance::with_center(|center| {
        let upcoming = center.find_future_appointments("", "all")?;
        println!("\n--- Booked Appointments ({}) ---", upcoming.len());

        for apt in upcoming {
            let patient = center.find_patient(&apt.patient_document)?;
            let doctor = center.find_professional(&apt.professional_document)?;
            println!(
                "  {} - {} with {}",
                apt.date_time.format("%a %Y-%m-%d %H:%M"),
                patient.full_name(),
                doctor.full_name()
            );
            println!("    ID: {}", apt.id);
        }
        Ok(())
    })
}

fn print_double_booking(monday: NaiveDate) -> CenterResult<()> {
    instance::with_center(|center| {
        let juan = center.find_patient("30999888")?;
        let doctor = center.find_professional(DOCTOR)?;
        let clash = Appointment::new(&juan, &doctor, monday.and_time(hm(9, 0)));

        println!("\nBooking {} at the same time as an existing appointment:", juan.full_name());
        match center.add_appointment(clash) {
            Ok(_) => println!("  accepted"),
            Err(e) => println!("  rejected: {}", e),
        }
        Ok(())
    })
}

/// The first Monday strictly after `from`.
fn next_monday(from: NaiveDate) -> NaiveDate {
    let ahead = 7 - i64::from(from.weekday().num_days_from_monday());
    from + Duration::days(ahead)
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

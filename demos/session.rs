use vocabulary::{Answer, Scheduler, now, stats};

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn review_due_cards(db: &mut Scheduler) -> Result<(), Box<dyn std::error::Error>> {
    let mut reviewed = 0;
    while db.peek().is_ok_and(|card| db.is_due(card)) {
        let card = db.pop()?;
        let Some(entry) = db.due_entry(&card) else {
            // nothing enabled, hand it back untouched
            db.put_back(card)?;
            break;
        };
        println!("Question: {}", entry.text);
        println!("Answer:   {card}");

        // Pretend the learner knows every short word.
        let answer = Answer::from(entry.text.len() <= 4);
        let outcome = db.answer(card, answer)?;
        println!(
            "{answer}: next review in {:.0} minutes",
            outcome.proficiency / 60.0
        );
        reviewed += 1;
    }
    println!("{reviewed} cards reviewed");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    // Create a database with two sides and a few cards that are due already
    let mut db = Scheduler::new(["English", "German"])?;
    let earlier = now() - 600.0;
    db.add_new_at(["cat", "Katze"], "", earlier)?;
    db.add_new_at(["dog", "Hund"], "", earlier)?;
    db.add_new_at(["squirrel", "Eichhörnchen"], "rodent", earlier)?;
    db.add_new_at(["house", "Haus"], "", earlier)?;

    review_due_cards(&mut db)?;

    // Save it, and read it back the way a front end would on startup
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("vocabulary.json");
    db.save(&path)?;
    let loaded = Scheduler::load(&path)?;
    if let Some(skew) = &loaded.version_skew {
        println!("warning: {skew}");
    }
    let db = loaded.scheduler;

    let summary = stats::summary(&db, now());
    println!("Total: {} cards, {} due", summary.cards, summary.due);
    if let Some(ratio) = summary.retention_ratio {
        println!("Retention score: {:.1}%", 100.0 * ratio);
    }
    println!("Entries due per day: {:?}", stats::due_forecast(&db, now(), 14));
    println!(
        "Entries per half-day of proficiency: {:?}",
        stats::proficiency_histogram(&db, 0.5 * stats::DAY, 20)?
    );
    Ok(())
}

use iab_tcf::ConsentRecord;
use std::env::args;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let s = args().nth(1).unwrap_or("".to_string());
    let record = ConsentRecord::try_decode(&s)?;

    println!("{:#?}", &record);

    Ok(())
}

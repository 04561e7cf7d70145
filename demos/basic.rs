use iab_tcf::ConsentRecord;

fn main() {
    let s = "COvFyGBOvFyGBAbAAAENAPCAAOAAAAAAAAAAAEEUACCKAEEgBAAIgAUABg4ACACA";
    let record = ConsentRecord::decode(s);

    println!("Version: {}", record.version());
    println!("CMP: {} (version {})", record.cmp_id(), record.cmp_version());
    println!("Consented purposes: {:?}", record.consented_purposes());

    for r in record.publisher_restrictions() {
        println!("Restriction: {:?}", r);
    }
}

use sheet2doc::{convert_sheet, ConvertOptions, Context, Sheet};

fn main() {
    let sheet = Sheet::from_json_str(
        r#"{
            "name": "!heroes",
            "rows": [
                ["Heroes of the realm"],
                ["$[]"],
                ["${}"],
                ["name", "class", "stats${}", null],
                [null, null, "str", "int"],
                ["$scheme_end"],
                ["Aria", "mage", 3, 18],
                ["Brom", "knight", 17, null]
            ],
            "merges": ["A2:D2", "A3:D3", "C4:D4"]
        }"#,
    );

    let sheet = match sheet {
        Ok(sheet) => sheet,
        Err(e) => {
            eprintln!("Failed to load sheet: {:?}", miette::Report::new(e));
            return;
        }
    };

    match convert_sheet(&sheet, &Context::default()) {
        Ok(result) => {
            println!("Successfully converted sheet to JSON:\n{}", result.to_json());
            let yaml = Context::new(ConvertOptions::yaml());
            if let Ok(result) = convert_sheet(&sheet, &yaml) {
                println!("\nand to YAML:\n{}", result.render());
            }
        }
        Err(e) => {
            eprintln!("Failed to convert sheet: {:?}", miette::Report::new(e));
        }
    }
}

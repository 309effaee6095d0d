/*!
A plain text table used by the cli to print run summaries.

```
use insurance_util::table::Table;

let table = Table::new(
	vec!["metric".to_owned(), "value".to_owned()],
	vec![vec!["accuracy".to_owned(), "0.91".to_owned()]],
);
assert_eq!(
	table.to_string(),
	"| metric   | value |\n|----------|-------|\n| accuracy | 0.91  |\n",
);
```
*/

pub struct Table {
	padding: usize,
	header: Vec<String>,
	rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
		Self {
			padding: 1,
			header,
			rows,
		}
	}
}

impl std::fmt::Display for Table {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		// Each column is as wide as its widest cell, header included.
		let mut column_widths: Vec<usize> = self.header.iter().map(|value| value.len()).collect();
		for row in self.rows.iter() {
			for (column_width, value) in column_widths.iter_mut().zip(row.iter()) {
				*column_width = usize::max(*column_width, value.len());
			}
		}
		let line = Line {
			column_widths: &column_widths,
			padding: self.padding,
		};
		let header = Row {
			column_widths: &column_widths,
			padding: self.padding,
			values: &self.header,
		};
		writeln!(f, "{}", header)?;
		writeln!(f, "{}", line)?;
		for values in self.rows.iter() {
			let row = Row {
				column_widths: &column_widths,
				padding: self.padding,
				values,
			};
			writeln!(f, "{}", row)?;
		}
		Ok(())
	}
}

struct Line<'a> {
	column_widths: &'a [usize],
	padding: usize,
}

impl<'a> std::fmt::Display for Line<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "|")?;
		for column_width in self.column_widths.iter() {
			write!(f, "{}|", "-".repeat(column_width + 2 * self.padding))?;
		}
		Ok(())
	}
}

struct Row<'a> {
	column_widths: &'a [usize],
	padding: usize,
	values: &'a [String],
}

impl<'a> std::fmt::Display for Row<'a> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "|")?;
		for (column_width, value) in self.column_widths.iter().zip(self.values) {
			let padding = " ".repeat(self.padding);
			let fill = " ".repeat(column_width - value.len());
			write!(f, "{}{}{}{}|", padding, value, fill, padding)?;
		}
		Ok(())
	}
}

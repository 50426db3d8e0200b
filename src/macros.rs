/// The purpose of this macro is to be able to generate code for each
/// primitive integer type (this means no f32 or f64).
/// You invoke the macro with the path to another macro that you would
/// like to invoke for each type.
/// Optionally you can restrict generation to either unsigned or signed
/// by typing `;unsigned` or `;signed` after the provided macro argument.
#[macro_export]
macro_rules! for_each_int_type {
	($macro:path) => {
		$crate::for_each_int_type!($macro;unsigned);
		$crate::for_each_int_type!($macro;signed);
	};
	($macro:path;unsigned) => {
		$macro!{usize}
		$macro!{u128}
		$macro!{u64}
		$macro!{u32}
		$macro!{u16}
		$macro!{u8}
	};
	($macro:path;signed) => {
		$macro!{isize}
		$macro!{i128}
		$macro!{i64}
		$macro!{i32}
		$macro!{i16}
		$macro!{i8}
	}
}

/// Continue a loop if a condition is met.
/// ```rs
/// for coord in 0..1024 {
/// 	continue_if!(header.sectors[coord].is_empty());
/// 	// ...
/// }
/// ```
#[macro_export]
macro_rules! continue_if {
	($($label:lifetime : )? $condition:expr) => {
		if $condition { continue $($label)?; }
	};
}

/// Return from a function if a condition is met.
/// ```rs
/// // return_if!(condition => expr)
/// return_if!(sector.is_empty() => Ok(None));
/// ```
#[macro_export]
macro_rules! return_if {
	($condition:expr $(=> $result:expr)?) => {
		if $condition {
			return $($result)?;
		}
	};
}

#[cfg(test)]
mod tests {
	#[test]
	fn control_flow_macros() {
		fn first_even(values: &[i32]) -> Option<i32> {
			for &value in values {
				continue_if!(value % 2 != 0);
				return_if!(value > 0 => Some(value));
			}
			None
		}
		assert_eq!(first_even(&[1, 3, -2, 5, 8]), Some(8));
		assert_eq!(first_even(&[1, 3]), None);
	}

	#[test]
	fn int_type_table() {
		let mut names = Vec::new();
		macro_rules! push_name {
			($token:ty) => {
				names.push(stringify!($token));
			};
		}
		for_each_int_type!(push_name;unsigned);
		assert_eq!(names, ["usize", "u128", "u64", "u32", "u16", "u8"]);
	}
}

use std::io::{self, BufRead, Write};

use crate::data::observation::Weather;
use crate::error::Result;

/// Prompt until the user enters a number. An empty line accepts `default`.
pub fn get_input<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: f64,
) -> io::Result<f64> {
    loop {
        write!(output, "{} [{}]: ", prompt, default)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(default);
        }

        let line = line.trim();
        if line.is_empty() {
            return Ok(default);
        }
        match line.parse() {
            Ok(num) => return Ok(num),
            Err(_) => writeln!(output, "Please enter a valid number")?,
        }
    }
}

/// Ask for each weather field, offering the values in `defaults`.
pub fn prompt_weather<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    defaults: &Weather,
) -> Result<Weather> {
    let temperature = get_input(input, output, "Temperature (°C)", defaults.temperature)?;
    let humidity = get_input(input, output, "Humidity (%)", defaults.humidity)?;
    let pressure = get_input(input, output, "Pressure (hPa)", defaults.pressure)?;
    let wind_speed = get_input(input, output, "Wind speed (m/s)", defaults.wind_speed)?;
    let wind_direction = get_input(input, output, "Wind direction (°)", defaults.wind_direction)?;
    let clouds = get_input(input, output, "Cloud cover (%)", defaults.clouds)?;

    Weather::new(temperature, humidity, pressure, wind_speed, wind_direction, clouds)
}
